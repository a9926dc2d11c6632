//! Application layer
//!
//! Use cases over the moderation domain. Services load an entity, run its
//! transition, persist it with a conditional write and then publish events.
//! Operations that touch more than one row stage their writes and commit them
//! through the `ModerationStore` in one unit.

pub mod badge_service;
pub mod panic_service;
pub mod reporting_service;
pub mod safety_service;
pub mod verification_service;

pub use badge_service::{BadgeService, BadgeView, UserBadges};
pub use panic_service::{PanicService, PanicTrigger, PanicView};
pub use reporting_service::{ReportDashboard, ReportSubmission, ReportingService, ReviewDecision};
pub use safety_service::{SafetyEvent, SafetyOverview, SafetyService};
pub use verification_service::{VerificationService, VerificationSubmission, VerificationView};

use crate::domain::ports::{ModerationEvent, Notifier};
use crate::error::DomainError;

/// Attempts at staging and committing a batch before a concurrent update is
/// reported to the caller
pub(crate) const MAX_COMMIT_ATTEMPTS: u32 = 5;

/// Whether a failed commit lost a version race and should be staged again
pub(crate) fn should_retry(err: &DomainError, attempt: u32) -> bool {
    let retry = matches!(err, DomainError::ConcurrentUpdate(_)) && attempt < MAX_COMMIT_ATTEMPTS;
    if retry {
        tracing::debug!(attempt, error = %err, "Retrying moderation commit");
    }
    retry
}

/// Deliver an event; delivery failures are logged and never fail the caller
pub(crate) async fn publish<N: Notifier + ?Sized>(notifier: &N, event: ModerationEvent) {
    if let Err(e) = notifier.notify(event).await {
        tracing::warn!(error = %e, "Failed to publish moderation event");
    }
}
