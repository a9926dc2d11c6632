//! Notifier that writes moderation events to the tracing log
//!
//! Each event is emitted as one structured line on the `moderation_events`
//! target so a log shipper can forward it to the member inbox and on-call
//! tooling.

use async_trait::async_trait;

use crate::domain::ports::{ModerationEvent, Notifier};
use crate::error::NotificationError;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl LogNotifier {
    fn kind(event: &ModerationEvent) -> &'static str {
        match event {
            ModerationEvent::ReportSubmitted { .. } => "report_submitted",
            ModerationEvent::ReportEscalated { .. } => "report_escalated",
            ModerationEvent::ReportResolved { .. } => "report_resolved",
            ModerationEvent::ReportDismissed { .. } => "report_dismissed",
            ModerationEvent::UserFlagged { .. } => "user_flagged",
            ModerationEvent::VerificationReviewed { .. } => "verification_reviewed",
            ModerationEvent::PanicTriggered { .. } => "panic_triggered",
            ModerationEvent::PanicEscalated { .. } => "panic_escalated",
            ModerationEvent::PanicClosed { .. } => "panic_closed",
            ModerationEvent::BadgeUpdated { .. } => "badge_updated",
        }
    }

    /// Events that on-call staff must see immediately
    fn is_urgent(event: &ModerationEvent) -> bool {
        matches!(
            event,
            ModerationEvent::PanicTriggered { .. }
                | ModerationEvent::PanicEscalated { .. }
                | ModerationEvent::ReportEscalated { .. }
        )
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: ModerationEvent) -> Result<(), NotificationError> {
        let payload = serde_json::to_string(&event)?;
        let kind = Self::kind(&event);

        if Self::is_urgent(&event) {
            tracing::warn!(target: "moderation_events", kind, %payload, "Urgent moderation event");
        } else {
            tracing::info!(target: "moderation_events", kind, %payload, "Moderation event");
        }
        Ok(())
    }
}
