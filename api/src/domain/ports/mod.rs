//! Domain ports (traits)
//!
//! Port traits define interfaces that the domain layer requires.
//! Adapters provide concrete implementations of these traits.

pub mod notifications;
pub mod repositories;
pub mod unit_of_work;

pub use notifications::{ModerationEvent, Notifier};
pub use repositories::{
    PanicActivationRepository, ReportRepository, SafetyScoreRepository, UserRepository,
    VerificationRequestRepository, VerifiedBadgeRepository,
};
pub use unit_of_work::{ModerationStore, ModerationWrites, StagedWrite};
