//! Adapters layer
//!
//! Implementations of port traits for external systems.

pub mod notify;
pub mod postgres;

pub use notify::LogNotifier;
pub use postgres::{
    PostgresModerationStore, PostgresPanicActivationRepository, PostgresReportRepository,
    PostgresSafetyScoreRepository, PostgresUserRepository, PostgresVerificationRequestRepository,
    PostgresVerifiedBadgeRepository,
};
