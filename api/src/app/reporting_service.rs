//! Reporting service
//!
//! Report intake, the admin review flow and the moderation dashboard.
//! A report write and its side effects on users (restrictions, safety score
//! events) are staged together and committed as one unit: a review lost to
//! another admin never touches the reported user, and a failed user write
//! leaves the report where it was.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::safety_service::{SafetyEvent, SafetyService, Standing};
use super::{publish, should_retry};
use crate::domain::entities::report::required_text;
use crate::domain::entities::{
    EvidenceRef, ModeratedUser, ModerationAction, NewReport, Report, ReportCategory, ReportId,
    ReportSeverity, ReportStatus, UserId,
};
use crate::domain::ports::{
    ModerationEvent, ModerationStore, ModerationWrites, Notifier, ReportRepository,
    SafetyScoreRepository, StagedWrite, UserRepository,
};
use crate::domain::scoring::{report_priority, PriorityInputs, ESCALATION_PRIORITY_FLOOR};
use crate::error::{AppError, DomainError};

const DEFAULT_BAN_REASON: &str = "Community guidelines violation";

/// A report as filed by a member
#[derive(Debug, Clone, Deserialize)]
pub struct ReportSubmission {
    pub reporter_id: UserId,
    pub reported_user_id: UserId,
    pub category: ReportCategory,
    #[serde(default)]
    pub subcategory: Option<String>,
    pub description: String,
    /// Derived from the category when absent
    #[serde(default)]
    pub severity: Option<ReportSeverity>,
    #[serde(default)]
    pub evidence: Vec<EvidenceRef>,
    #[serde(default)]
    pub is_anonymous: bool,
}

/// What the reviewing admin decided
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReviewDecision {
    UnderReview,
    Resolve {
        #[serde(default)]
        actions: Vec<ModerationAction>,
        #[serde(default)]
        notes: Option<String>,
    },
    Dismiss {
        reason: String,
    },
    Escalate {
        reason: String,
    },
}

/// Counts for the moderation dashboard
#[derive(Debug, Clone, Serialize)]
pub struct ReportDashboard {
    pub pending_reports: u64,
    pub high_priority_pending: u64,
    pub high_priority_threshold: i32,
    pub by_status: BTreeMap<String, u64>,
    pub by_severity: BTreeMap<String, u64>,
}

/// Service for the report lifecycle
pub struct ReportingService<RR, SR, UR, MS, N>
where
    RR: ReportRepository,
    SR: SafetyScoreRepository,
    UR: UserRepository,
    MS: ModerationStore,
    N: Notifier,
{
    reports: Arc<RR>,
    safety: Arc<SafetyService<SR, UR, MS, N>>,
    notifier: Arc<N>,
    duplicate_window: Duration,
    high_priority_threshold: i32,
}

impl<RR, SR, UR, MS, N> ReportingService<RR, SR, UR, MS, N>
where
    RR: ReportRepository,
    SR: SafetyScoreRepository,
    UR: UserRepository,
    MS: ModerationStore,
    N: Notifier,
{
    pub fn new(
        reports: Arc<RR>,
        safety: Arc<SafetyService<SR, UR, MS, N>>,
        notifier: Arc<N>,
        duplicate_window_days: i64,
        high_priority_threshold: i32,
    ) -> Self {
        Self {
            reports,
            safety,
            notifier,
            duplicate_window: Duration::days(duplicate_window_days),
            high_priority_threshold,
        }
    }

    /// File a new report
    ///
    /// Critical reports skip the queue and are stored already escalated.
    pub async fn submit_report(&self, submission: ReportSubmission) -> Result<Report, AppError> {
        let now = Utc::now();
        let description = required_text(&submission.description, "description")?;

        if submission.reporter_id == submission.reported_user_id {
            return Err(DomainError::Validation("Users cannot report themselves".into()).into());
        }

        let since = now - self.duplicate_window;
        if self
            .reports
            .exists_from_reporter_since(
                &submission.reporter_id,
                &submission.reported_user_id,
                since,
            )
            .await?
        {
            return Err(DomainError::Conflict(
                "You have already reported this user recently".into(),
            )
            .into());
        }

        let subcategory = submission
            .subcategory
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let severity = submission.severity.unwrap_or_else(|| {
            submission
                .category
                .default_severity(subcategory.as_deref())
        });
        let history = self
            .reports
            .count_against_user(&submission.reported_user_id, None)
            .await?;

        let mut priority_score = report_priority(&PriorityInputs {
            severity,
            category: submission.category,
            has_evidence: !submission.evidence.is_empty(),
            target_report_count: history,
            days_since_created: 0,
        });
        let status = if severity == ReportSeverity::Critical {
            priority_score = priority_score.max(ESCALATION_PRIORITY_FLOOR);
            ReportStatus::Escalated
        } else {
            ReportStatus::Pending
        };

        let report = Report::filed(
            NewReport {
                reporter_id: submission.reporter_id,
                reported_user_id: submission.reported_user_id,
                category: submission.category,
                subcategory,
                description,
                severity,
                status,
                evidence: submission.evidence,
                priority_score,
                is_anonymous: submission.is_anonymous,
            },
            now,
        );

        let mut attempt = 0;
        let mut standing = loop {
            attempt += 1;
            let mut standing = self.safety.load_standing(&report.reported_user_id).await?;
            standing.record(SafetyEvent::Report { verified: false }, now);

            let mut writes = ModerationWrites::new();
            writes.push(StagedWrite::InsertReport(report.clone()));
            standing.stage(&mut writes);
            match self.safety.commit(&writes).await {
                Ok(()) => break standing,
                Err(e) if should_retry(&e, attempt) => continue,
                Err(e) => return Err(e.into()),
            }
        };

        tracing::info!(
            report_id = %report.id,
            category = %report.category,
            severity = %report.severity,
            priority = report.priority_score,
            status = %report.status,
            "Report submitted"
        );
        self.safety.settle(&mut standing, now).await;

        publish(
            self.notifier.as_ref(),
            ModerationEvent::ReportSubmitted {
                report_id: report.id,
                reported_user_id: report.reported_user_id,
                severity: report.severity,
                priority_score: report.priority_score,
                timestamp: now,
            },
        )
        .await;
        if report.status == ReportStatus::Escalated {
            publish(
                self.notifier.as_ref(),
                ModerationEvent::ReportEscalated {
                    report_id: report.id,
                    reported_user_id: report.reported_user_id,
                    reason: "Critical severity".into(),
                    timestamp: now,
                },
            )
            .await;
        }

        Ok(report)
    }

    pub async fn get_report(&self, id: &ReportId) -> Result<Report, AppError> {
        self.reports
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {}", id)))
    }

    /// Apply an admin decision to a report
    ///
    /// The report transition and every consequence for the users involved
    /// commit together; a version race on a user restages from fresh reads.
    pub async fn review_report(
        &self,
        id: &ReportId,
        reviewer: UserId,
        decision: ReviewDecision,
    ) -> Result<Report, AppError> {
        let now = Utc::now();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut report = self.get_report(id).await?;
            let expected = report.status;

            match &decision {
                ReviewDecision::UnderReview => report.mark_under_review(reviewer, now)?,
                ReviewDecision::Resolve { actions, notes } => {
                    let notes = notes
                        .as_deref()
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(String::from);
                    report.mark_resolved(reviewer, actions.clone(), notes, now)?
                }
                ReviewDecision::Dismiss { reason } => {
                    report.mark_dismissed(reviewer, reason, now)?
                }
                ReviewDecision::Escalate { reason } => report.escalate(reviewer, reason, now)?,
            }

            let history = self
                .reports
                .count_against_user(&report.reported_user_id, Some(&report.id))
                .await?;
            report.refresh_priority(history, now);

            let mut writes = ModerationWrites::new();
            writes.push(StagedWrite::ReportTransition {
                report: report.clone(),
                expected,
            });
            let mut standing = self.stage_consequences(&report, &decision, now).await?;
            if let Some(standing) = &standing {
                standing.stage(&mut writes);
            }

            match self.safety.commit(&writes).await {
                Ok(()) => {}
                Err(e) if should_retry(&e, attempt) => continue,
                Err(e) => return Err(e.into()),
            }

            tracing::info!(
                report_id = %report.id,
                reviewer = %reviewer,
                from = %expected,
                to = %report.status,
                priority = report.priority_score,
                "Report reviewed"
            );
            if let Some(standing) = standing.as_mut() {
                self.safety.settle(standing, now).await;
            }
            self.announce_review(&report, &decision, now).await;
            return Ok(report);
        }
    }

    /// The standing a decision changes: the reported user on resolve, the
    /// reporter on dismissal
    async fn stage_consequences(
        &self,
        report: &Report,
        decision: &ReviewDecision,
        now: DateTime<Utc>,
    ) -> Result<Option<Standing>, AppError> {
        match decision {
            ReviewDecision::Resolve { actions, .. } => {
                let mut standing = self.safety.load_standing(&report.reported_user_id).await?;
                apply_actions(&mut standing.user, actions, now);
                standing.record(SafetyEvent::ReportUpheld, now);
                Ok(Some(standing))
            }
            ReviewDecision::Dismiss { .. } => {
                let mut standing = self.safety.load_standing(&report.reporter_id).await?;
                standing.record(SafetyEvent::FalseReport, now);
                Ok(Some(standing))
            }
            ReviewDecision::UnderReview | ReviewDecision::Escalate { .. } => Ok(None),
        }
    }

    async fn announce_review(
        &self,
        report: &Report,
        decision: &ReviewDecision,
        now: DateTime<Utc>,
    ) {
        let event = match decision {
            ReviewDecision::Resolve { actions, .. } => {
                if !actions.is_empty() {
                    tracing::info!(
                        user_id = %report.reported_user_id,
                        actions = actions.len(),
                        "Applied moderation actions"
                    );
                }
                ModerationEvent::ReportResolved {
                    report_id: report.id,
                    reported_user_id: report.reported_user_id,
                    actions: actions.clone(),
                    timestamp: now,
                }
            }
            ReviewDecision::Dismiss { .. } => ModerationEvent::ReportDismissed {
                report_id: report.id,
                reporter_id: report.reporter_id,
                timestamp: now,
            },
            ReviewDecision::Escalate { reason } => ModerationEvent::ReportEscalated {
                report_id: report.id,
                reported_user_id: report.reported_user_id,
                reason: reason.clone(),
                timestamp: now,
            },
            ReviewDecision::UnderReview => return,
        };
        publish(self.notifier.as_ref(), event).await;
    }

    /// Recompute and store a report's priority for the current history and age
    pub async fn recompute_priority(&self, id: &ReportId) -> Result<Report, AppError> {
        let mut report = self.get_report(id).await?;
        let history = self
            .reports
            .count_against_user(&report.reported_user_id, Some(&report.id))
            .await?;
        let before = report.priority_score;
        report.refresh_priority(history, Utc::now());

        if report.priority_score != before {
            self.reports
                .update_priority(&report.id, report.priority_score)
                .await?;
            tracing::debug!(
                report_id = %report.id,
                from = before,
                to = report.priority_score,
                "Report priority updated"
            );
        }
        Ok(report)
    }

    /// Open reports, most urgent first
    pub async fn review_queue(&self, limit: u64) -> Result<Vec<Report>, AppError> {
        Ok(self.reports.find_open_by_priority(limit).await?)
    }

    pub async fn dashboard(&self) -> Result<ReportDashboard, AppError> {
        let mut by_status: BTreeMap<String, u64> = ReportStatus::ALL
            .iter()
            .map(|s| (s.to_string(), 0))
            .collect();
        for (status, count) in self.reports.count_by_status().await? {
            by_status.insert(status.to_string(), count);
        }

        let mut by_severity: BTreeMap<String, u64> = ReportSeverity::ALL
            .iter()
            .map(|s| (s.to_string(), 0))
            .collect();
        for (severity, count) in self.reports.count_by_severity().await? {
            by_severity.insert(severity.to_string(), count);
        }

        let high_priority_pending = self
            .reports
            .count_pending_with_priority_at_least(self.high_priority_threshold)
            .await?;

        Ok(ReportDashboard {
            pending_reports: by_status
                .get(&ReportStatus::Pending.to_string())
                .copied()
                .unwrap_or(0),
            high_priority_pending,
            high_priority_threshold: self.high_priority_threshold,
            by_status,
            by_severity,
        })
    }
}

/// Apply resolve actions to the reported user's moderation state
fn apply_actions(user: &mut ModeratedUser, actions: &[ModerationAction], now: DateTime<Utc>) {
    for action in actions {
        match action {
            ModerationAction::Warning { details } => user.issue_warning(details.as_deref(), now),
            ModerationAction::RestrictMessaging { duration } => {
                user.restrict_messaging(*duration, now)
            }
            ModerationAction::RestrictPhotos { duration } => user.restrict_photos(*duration, now),
            ModerationAction::SuspendAccount { duration } => user.suspend(*duration, now),
            ModerationAction::BanAccount { reason } => {
                let reason = reason.trim();
                user.ban(if reason.is_empty() {
                    DEFAULT_BAN_REASON
                } else {
                    reason
                })
            }
        }
    }
}
