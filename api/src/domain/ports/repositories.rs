//! Repository port traits
//!
//! These traits define the interface for data persistence.
//! Implementations are provided by adapters (e.g., PostgreSQL).
//!
//! Every `update_transition` is a conditional write: it only applies while
//! the stored status still equals `expected`. Losing that race returns
//! `DomainError::Conflict` and writes nothing.
//!
//! Reports, safety scores and moderated users are only written through
//! [`ModerationStore`](super::ModerationStore), so their repositories are
//! read-mostly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::{
    BadgeId, BadgeStatus, ModeratedUser, NewPanicActivation, NewVerifiedBadge, PanicActivation,
    PanicActivationId, PanicStatus, Report, ReportId, ReportSeverity, ReportStatus, SafetyScore,
    UserId, VerificationRequest, VerificationRequestId, VerificationStatus, VerificationType,
    VerifiedBadge,
};
use crate::error::DomainError;

/// Repository for Report entities
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Find a report by ID
    async fn find_by_id(&self, id: &ReportId) -> Result<Option<Report>, DomainError>;

    /// Store a recomputed priority
    async fn update_priority(&self, id: &ReportId, priority_score: i32)
        -> Result<(), DomainError>;

    /// Number of reports filed against a user, optionally leaving one out
    async fn count_against_user(
        &self,
        user_id: &UserId,
        exclude: Option<&ReportId>,
    ) -> Result<u32, DomainError>;

    /// Whether `reporter_id` already reported `reported_user_id` since `since`
    async fn exists_from_reporter_since(
        &self,
        reporter_id: &UserId,
        reported_user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<bool, DomainError>;

    /// Open reports, highest priority first
    async fn find_open_by_priority(&self, limit: u64) -> Result<Vec<Report>, DomainError>;

    /// Report totals per status
    async fn count_by_status(&self) -> Result<Vec<(ReportStatus, u64)>, DomainError>;

    /// Report totals per severity
    async fn count_by_severity(&self) -> Result<Vec<(ReportSeverity, u64)>, DomainError>;

    /// Pending reports whose stored priority is at least `threshold`
    async fn count_pending_with_priority_at_least(&self, threshold: i32)
        -> Result<u64, DomainError>;
}

/// Repository for per-user safety scores
#[async_trait]
pub trait SafetyScoreRepository: Send + Sync {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<SafetyScore>, DomainError>;

    /// Records matching the manual review rule, lowest trust first
    async fn find_needs_review(&self, limit: u64) -> Result<Vec<SafetyScore>, DomainError>;
}

/// Repository for the moderation view of users
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<ModeratedUser>, DomainError>;
}

/// Repository for VerificationRequest entities
#[async_trait]
pub trait VerificationRequestRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &VerificationRequestId,
    ) -> Result<Option<VerificationRequest>, DomainError>;

    /// Whether the user has a pending or needs-review request of this type
    async fn has_open_request(
        &self,
        user_id: &UserId,
        verification_type: VerificationType,
    ) -> Result<bool, DomainError>;

    async fn update_transition(
        &self,
        request: &VerificationRequest,
        expected: VerificationStatus,
    ) -> Result<(), DomainError>;
}

/// Repository for PanicActivation entities
#[async_trait]
pub trait PanicActivationRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &PanicActivationId,
    ) -> Result<Option<PanicActivation>, DomainError>;

    /// Store a new active panic. Returns `Conflict` while the user already
    /// has an active or escalated one.
    async fn create(&self, panic: &NewPanicActivation) -> Result<PanicActivation, DomainError>;

    /// The user's active or escalated panic, if any
    async fn find_open_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<PanicActivation>, DomainError>;

    async fn update_transition(
        &self,
        panic: &PanicActivation,
        expected: PanicStatus,
    ) -> Result<(), DomainError>;

    /// Panics that are active or escalated, oldest first
    async fn find_open(&self) -> Result<Vec<PanicActivation>, DomainError>;
}

/// Repository for VerifiedBadge entities
#[async_trait]
pub trait VerifiedBadgeRepository: Send + Sync {
    async fn find_by_id(&self, id: &BadgeId) -> Result<Option<VerifiedBadge>, DomainError>;

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<VerifiedBadge>, DomainError>;

    async fn create(&self, badge: &NewVerifiedBadge) -> Result<VerifiedBadge, DomainError>;

    async fn update_transition(
        &self,
        badge: &VerifiedBadge,
        expected: BadgeStatus,
    ) -> Result<(), DomainError>;
}
