//! Domain entities
//!
//! Pure domain models for the moderation core.
//! These are separate from the SeaORM entities in the `entity` module.

pub mod panic_activation;
pub mod report;
pub mod safety_score;
pub mod user;
pub mod verification_request;
pub mod verified_badge;

pub use panic_activation::{
    NewPanicActivation, PanicActivation, PanicActivationId, PanicSeverity, PanicStatus,
    TriggerType,
};
pub use report::{
    EvidenceRef, ModerationAction, NewReport, Report, ReportCategory, ReportId, ReportSeverity,
    ReportStatus,
};
pub use safety_score::{
    ActionPriority, RecommendedAction, RecommendedActionKind, RiskCategory, SafetyScore,
    TrustLevel,
};
pub use user::{AccountStatus, ModeratedUser, Restrictions, UserId};
pub use verification_request::{
    DocumentSubmission, NewVerificationRequest, VerificationRequest, VerificationRequestId,
    VerificationStatus, VerificationType,
};
pub use verified_badge::{BadgeId, BadgeStatus, BadgeType, NewVerifiedBadge, VerifiedBadge};
