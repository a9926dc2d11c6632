//! Unit of work port
//!
//! A moderation decision touches several rows at once: the report, the
//! safety score and moderation state of the users involved, a verification
//! request and its badge. Services stage those writes in a
//! [`ModerationWrites`] batch and hand it to a [`ModerationStore`], which
//! applies all of them or none.
//!
//! Scores and users carry a row version. A staged score or user at version 0
//! is inserted; any other version replaces the stored row only while it is
//! still at that version. Losing that race returns
//! `DomainError::ConcurrentUpdate` and the caller stages again from fresh
//! reads. Status-guarded rows (reports, verification requests, badges) keep
//! returning `DomainError::Conflict`, which is never retried.

use async_trait::async_trait;

use crate::domain::entities::{
    BadgeStatus, ModeratedUser, Report, ReportStatus, SafetyScore, VerificationRequest,
    VerificationStatus, VerifiedBadge,
};
use crate::error::DomainError;

/// One write inside a batch
#[derive(Debug, Clone)]
pub enum StagedWrite {
    InsertReport(Report),
    ReportTransition {
        report: Report,
        expected: ReportStatus,
    },
    Score(SafetyScore),
    User(ModeratedUser),
    /// Refused with `Conflict` while the user has an open request of the same type
    InsertVerification(VerificationRequest),
    VerificationTransition {
        request: VerificationRequest,
        expected: VerificationStatus,
    },
    InsertBadge(VerifiedBadge),
    BadgeTransition {
        badge: VerifiedBadge,
        expected: BadgeStatus,
    },
}

/// Writes staged by one operation, applied in order
#[derive(Debug, Clone, Default)]
pub struct ModerationWrites {
    writes: Vec<StagedWrite>,
}

impl ModerationWrites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, write: StagedWrite) {
        self.writes.push(write);
    }

    pub fn iter(&self) -> impl Iterator<Item = &StagedWrite> {
        self.writes.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Commits a batch of moderation writes atomically
#[async_trait]
pub trait ModerationStore: Send + Sync {
    async fn commit(&self, writes: &ModerationWrites) -> Result<(), DomainError>;
}
