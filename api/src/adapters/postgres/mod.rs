//! PostgreSQL adapters
//!
//! Implementations of repository traits using SeaORM and PostgreSQL.

pub mod badge_repo;
pub mod moderation_store;
pub mod panic_repo;
pub mod report_repo;
pub mod safety_score_repo;
pub mod user_repo;
pub mod verification_repo;

#[cfg(test)]
mod integration_tests;

pub use badge_repo::PostgresVerifiedBadgeRepository;
pub use moderation_store::PostgresModerationStore;
pub use panic_repo::PostgresPanicActivationRepository;
pub use report_repo::PostgresReportRepository;
pub use safety_score_repo::PostgresSafetyScoreRepository;
pub use user_repo::PostgresUserRepository;
pub use verification_repo::PostgresVerificationRequestRepository;

use sea_orm::{DbErr, SqlErr};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::DomainError;

/// Parse a string-backed enum column, treating unknown values as corruption
pub(crate) fn parse_column<T>(value: &str, column: &str) -> Result<T, DomainError>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e| DomainError::Internal(format!("{} holds invalid value: {}", column, e)))
}

/// Stored counters are signed; negative values never reach the domain
pub(crate) fn non_negative(value: i32, column: &str) -> Result<u32, DomainError> {
    u32::try_from(value)
        .map_err(|_| DomainError::Validation(format!("{} cannot be negative: {}", column, value)))
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(value).map_err(|e| DomainError::Internal(e.to_string()))
}

pub(crate) fn from_json<T: DeserializeOwned>(
    value: serde_json::Value,
    column: &str,
) -> Result<T, DomainError> {
    serde_json::from_value(value)
        .map_err(|e| DomainError::Internal(format!("{} holds invalid JSON: {}", column, e)))
}

/// Map a failed write, reporting a unique index violation as `Conflict`
pub(crate) fn write_error(err: DbErr, conflict: impl FnOnce() -> String) -> DomainError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => DomainError::Conflict(conflict()),
        _ => DomainError::Database(err.to_string()),
    }
}
