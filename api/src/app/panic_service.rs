//! Panic service
//!
//! Emergency activations raised by members and handled by the safety team.
//! A member has at most one open (active or escalated) panic at a time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::publish;
use crate::domain::entities::{
    NewPanicActivation, PanicActivation, PanicActivationId, PanicSeverity, TriggerType, UserId,
};
use crate::domain::ports::{ModerationEvent, Notifier, PanicActivationRepository};
use crate::error::{AppError, DomainError};

/// A member's panic activation as captured by the app
#[derive(Debug, Clone, Deserialize)]
pub struct PanicTrigger {
    pub user_id: UserId,
    pub trigger_type: TriggerType,
    #[serde(default)]
    pub user_message: Option<String>,
    #[serde(default)]
    pub location_address: Option<String>,
}

/// Panic activation with its response clock evaluated
#[derive(Debug, Clone, Serialize)]
pub struct PanicView {
    #[serde(flatten)]
    pub panic: PanicActivation,
    pub severity: PanicSeverity,
    pub respond_by: DateTime<Utc>,
    pub is_overdue: bool,
    pub duration_minutes: i64,
    pub duration: String,
}

impl PanicView {
    fn at(panic: PanicActivation, now: DateTime<Utc>) -> Self {
        Self {
            severity: panic.severity(),
            respond_by: panic.response_deadline(),
            is_overdue: panic.is_overdue(now),
            duration_minutes: panic.duration_minutes(now),
            duration: panic.formatted_duration(now),
            panic,
        }
    }
}

pub struct PanicService<PR, N>
where
    PR: PanicActivationRepository,
    N: Notifier,
{
    panics: Arc<PR>,
    notifier: Arc<N>,
}

impl<PR, N> PanicService<PR, N>
where
    PR: PanicActivationRepository,
    N: Notifier,
{
    pub fn new(panics: Arc<PR>, notifier: Arc<N>) -> Self {
        Self { panics, notifier }
    }

    pub async fn trigger(&self, trigger: PanicTrigger) -> Result<PanicView, AppError> {
        if let Some(open) = self.panics.find_open_for_user(&trigger.user_id).await? {
            tracing::info!(
                panic_id = %open.id,
                user_id = %trigger.user_id,
                "Panic already active, ignoring new trigger"
            );
            return Err(
                DomainError::Conflict(format!("Panic button is already active (panic {})", open.id))
                    .into(),
            );
        }

        let panic = self
            .panics
            .create(&NewPanicActivation {
                user_id: trigger.user_id,
                trigger_type: trigger.trigger_type,
                user_message: non_blank(trigger.user_message),
                location_address: non_blank(trigger.location_address),
            })
            .await?;

        tracing::warn!(
            panic_id = %panic.id,
            user_id = %panic.user_id,
            trigger = %panic.trigger_type,
            severity = %panic.severity(),
            respond_within_minutes = panic.response_minutes(),
            "Panic activated"
        );
        publish(
            self.notifier.as_ref(),
            ModerationEvent::PanicTriggered {
                panic_id: panic.id,
                user_id: panic.user_id,
                severity: panic.severity(),
                respond_by: panic.response_deadline(),
            },
        )
        .await;

        Ok(PanicView::at(panic, Utc::now()))
    }

    pub async fn get(&self, id: &PanicActivationId) -> Result<PanicView, AppError> {
        let panic = self.load(id).await?;
        Ok(PanicView::at(panic, Utc::now()))
    }

    pub async fn resolve(
        &self,
        id: &PanicActivationId,
        resolver: UserId,
        notes: &str,
        false_alarm: bool,
    ) -> Result<PanicView, AppError> {
        let now = Utc::now();
        let mut panic = self.load(id).await?;
        let expected = panic.status;
        panic.resolve(resolver, notes, false_alarm, now)?;
        self.panics.update_transition(&panic, expected).await?;

        tracing::info!(
            panic_id = %panic.id,
            from = %expected,
            to = %panic.status,
            duration = %panic.formatted_duration(now),
            "Panic closed"
        );
        publish(
            self.notifier.as_ref(),
            ModerationEvent::PanicClosed {
                panic_id: panic.id,
                user_id: panic.user_id,
                status: panic.status,
                timestamp: now,
            },
        )
        .await;

        Ok(PanicView::at(panic, now))
    }

    pub async fn escalate(
        &self,
        id: &PanicActivationId,
        by: UserId,
        notes: &str,
    ) -> Result<PanicView, AppError> {
        let now = Utc::now();
        let mut panic = self.load(id).await?;
        let expected = panic.status;
        panic.escalate_to_authorities(by, notes)?;
        self.panics.update_transition(&panic, expected).await?;

        tracing::warn!(
            panic_id = %panic.id,
            user_id = %panic.user_id,
            escalated_by = %by,
            "Panic escalated to authorities"
        );
        publish(
            self.notifier.as_ref(),
            ModerationEvent::PanicEscalated {
                panic_id: panic.id,
                user_id: panic.user_id,
                timestamp: now,
            },
        )
        .await;

        Ok(PanicView::at(panic, now))
    }

    /// Open panics, overdue first, then by response deadline
    pub async fn open_queue(&self) -> Result<Vec<PanicView>, AppError> {
        let now = Utc::now();
        let mut open: Vec<PanicView> = self
            .panics
            .find_open()
            .await?
            .into_iter()
            .filter(|p| !p.status.is_resolved())
            .map(|p| PanicView::at(p, now))
            .collect();
        open.sort_by(|a, b| {
            b.is_overdue
                .cmp(&a.is_overdue)
                .then(a.respond_by.cmp(&b.respond_by))
        });

        let overdue = open.iter().filter(|p| p.is_overdue).count();
        if overdue > 0 {
            tracing::warn!(open = open.len(), overdue, "Overdue panic activations");
        }
        Ok(open)
    }

    async fn load(&self, id: &PanicActivationId) -> Result<PanicActivation, AppError> {
        self.panics
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Panic activation {}", id)))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
