//! Notification port trait
//!
//! Moderation outcomes that other parts of the platform (member inbox,
//! on-call safety staff) need to hear about.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::entities::{
    BadgeId, BadgeStatus, ModerationAction, PanicActivationId, PanicSeverity, PanicStatus,
    ReportId, ReportSeverity, RiskCategory, UserId, VerificationRequestId, VerificationStatus,
};
use crate::error::NotificationError;

/// Event types published after a moderation write succeeds
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModerationEvent {
    ReportSubmitted {
        report_id: ReportId,
        reported_user_id: UserId,
        severity: ReportSeverity,
        priority_score: i32,
        timestamp: DateTime<Utc>,
    },
    ReportEscalated {
        report_id: ReportId,
        reported_user_id: UserId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    ReportResolved {
        report_id: ReportId,
        reported_user_id: UserId,
        actions: Vec<ModerationAction>,
        timestamp: DateTime<Utc>,
    },
    ReportDismissed {
        report_id: ReportId,
        reporter_id: UserId,
        timestamp: DateTime<Utc>,
    },
    UserFlagged {
        user_id: UserId,
        trust_score: i32,
        risk_category: RiskCategory,
        timestamp: DateTime<Utc>,
    },
    VerificationReviewed {
        request_id: VerificationRequestId,
        user_id: UserId,
        status: VerificationStatus,
        timestamp: DateTime<Utc>,
    },
    PanicTriggered {
        panic_id: PanicActivationId,
        user_id: UserId,
        severity: PanicSeverity,
        respond_by: DateTime<Utc>,
    },
    PanicEscalated {
        panic_id: PanicActivationId,
        user_id: UserId,
        timestamp: DateTime<Utc>,
    },
    PanicClosed {
        panic_id: PanicActivationId,
        user_id: UserId,
        status: PanicStatus,
        timestamp: DateTime<Utc>,
    },
    BadgeUpdated {
        badge_id: BadgeId,
        user_id: UserId,
        status: BadgeStatus,
        expires_at: Option<DateTime<Utc>>,
    },
}

/// Port trait for publishing moderation events
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: ModerationEvent) -> Result<(), NotificationError>;
}
