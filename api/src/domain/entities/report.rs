//! Report domain entity
//!
//! A member's report against another member, and its review lifecycle:
//!
//! ```text
//! pending      -> under_review | resolved | dismissed | escalated
//! under_review -> under_review | resolved | dismissed | escalated
//! escalated    -> under_review | resolved | dismissed
//! resolved, dismissed: terminal
//! ```
//!
//! The review step is optional: a pending report may be resolved, dismissed or
//! escalated directly. An escalated report stays open for a senior reviewer, who
//! may take it under review, resolve or dismiss it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserId;
use crate::domain::scoring::{report_priority, PriorityInputs, ESCALATION_PRIORITY_FLOOR};
use crate::error::DomainError;

/// Unique identifier for a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportId(pub Uuid);

impl ReportId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ReportId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ReportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the report is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportCategory {
    InappropriateBehavior,
    Harassment,
    FakeProfile,
    Spam,
    InappropriatePhotos,
    ScamAttempt,
    HateSpeech,
    ViolenceThreat,
    Underage,
    StolenPhotos,
    Catfishing,
    InappropriateMessages,
    OfflineBehavior,
    Other,
}

/// Subcategories that raise an otherwise medium report to high severity
pub const HIGH_SEVERITY_SUBCATEGORIES: [&str; 3] =
    ["sexual_harassment", "financial_scam", "identity_theft"];

impl ReportCategory {
    pub const ALL: [ReportCategory; 14] = [
        ReportCategory::InappropriateBehavior,
        ReportCategory::Harassment,
        ReportCategory::FakeProfile,
        ReportCategory::Spam,
        ReportCategory::InappropriatePhotos,
        ReportCategory::ScamAttempt,
        ReportCategory::HateSpeech,
        ReportCategory::ViolenceThreat,
        ReportCategory::Underage,
        ReportCategory::StolenPhotos,
        ReportCategory::Catfishing,
        ReportCategory::InappropriateMessages,
        ReportCategory::OfflineBehavior,
        ReportCategory::Other,
    ];

    /// Weight added to the severity base when scoring priority
    pub fn priority_weight(&self) -> i32 {
        match self {
            ReportCategory::ViolenceThreat
            | ReportCategory::Harassment
            | ReportCategory::HateSpeech => 8,
            ReportCategory::InappropriateBehavior | ReportCategory::ScamAttempt => 6,
            ReportCategory::FakeProfile | ReportCategory::Catfishing => 4,
            ReportCategory::InappropriatePhotos | ReportCategory::Spam => 3,
            _ => 2,
        }
    }

    /// Severity assigned at submission when the reporter does not pick one
    pub fn default_severity(&self, subcategory: Option<&str>) -> ReportSeverity {
        match self {
            ReportCategory::ViolenceThreat
            | ReportCategory::Harassment
            | ReportCategory::HateSpeech
            | ReportCategory::Underage => ReportSeverity::Critical,
            ReportCategory::ScamAttempt
            | ReportCategory::InappropriateBehavior
            | ReportCategory::Catfishing => ReportSeverity::High,
            _ if subcategory.is_some_and(|s| HIGH_SEVERITY_SUBCATEGORIES.contains(&s)) => {
                ReportSeverity::High
            }
            _ => ReportSeverity::Medium,
        }
    }
}

impl std::fmt::Display for ReportCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReportCategory::InappropriateBehavior => "inappropriate_behavior",
            ReportCategory::Harassment => "harassment",
            ReportCategory::FakeProfile => "fake_profile",
            ReportCategory::Spam => "spam",
            ReportCategory::InappropriatePhotos => "inappropriate_photos",
            ReportCategory::ScamAttempt => "scam_attempt",
            ReportCategory::HateSpeech => "hate_speech",
            ReportCategory::ViolenceThreat => "violence_threat",
            ReportCategory::Underage => "underage",
            ReportCategory::StolenPhotos => "stolen_photos",
            ReportCategory::Catfishing => "catfishing",
            ReportCategory::InappropriateMessages => "inappropriate_messages",
            ReportCategory::OfflineBehavior => "offline_behavior",
            ReportCategory::Other => "other",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for ReportCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        ReportCategory::ALL
            .into_iter()
            .find(|c| c.to_string() == lowered)
            .ok_or_else(|| format!("Unknown report category: {}", s))
    }
}

/// How serious the reported behaviour is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ReportSeverity {
    pub const ALL: [ReportSeverity; 4] = [
        ReportSeverity::Low,
        ReportSeverity::Medium,
        ReportSeverity::High,
        ReportSeverity::Critical,
    ];

    /// Base priority contributed by the severity
    pub fn base_score(&self) -> i32 {
        match self {
            ReportSeverity::Low => 1,
            ReportSeverity::Medium => 3,
            ReportSeverity::High => 6,
            ReportSeverity::Critical => 10,
        }
    }
}

impl std::fmt::Display for ReportSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportSeverity::Low => write!(f, "low"),
            ReportSeverity::Medium => write!(f, "medium"),
            ReportSeverity::High => write!(f, "high"),
            ReportSeverity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for ReportSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(ReportSeverity::Low),
            "medium" => Ok(ReportSeverity::Medium),
            "high" => Ok(ReportSeverity::High),
            "critical" => Ok(ReportSeverity::Critical),
            _ => Err(format!("Unknown report severity: {}", s)),
        }
    }
}

/// Report review status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    UnderReview,
    Resolved,
    Dismissed,
    Escalated,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 5] = [
        ReportStatus::Pending,
        ReportStatus::UnderReview,
        ReportStatus::Resolved,
        ReportStatus::Dismissed,
        ReportStatus::Escalated,
    ];

    /// Resolved and dismissed reports are closed for good
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStatus::Resolved | ReportStatus::Dismissed)
    }

    /// The directed edges of the report lifecycle
    pub fn can_transition_to(&self, next: ReportStatus) -> bool {
        use ReportStatus::*;
        match (self, next) {
            (Resolved | Dismissed, _) => false,
            (_, Pending) => false,
            (Escalated, Escalated) => false,
            (Pending | UnderReview | Escalated, _) => true,
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportStatus::Pending => write!(f, "pending"),
            ReportStatus::UnderReview => write!(f, "under_review"),
            ReportStatus::Resolved => write!(f, "resolved"),
            ReportStatus::Dismissed => write!(f, "dismissed"),
            ReportStatus::Escalated => write!(f, "escalated"),
        }
    }
}

impl std::str::FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ReportStatus::Pending),
            "under_review" => Ok(ReportStatus::UnderReview),
            "resolved" => Ok(ReportStatus::Resolved),
            "dismissed" => Ok(ReportStatus::Dismissed),
            "escalated" => Ok(ReportStatus::Escalated),
            _ => Err(format!("Unknown report status: {}", s)),
        }
    }
}

/// Reference to an evidence attachment stored outside the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRef {
    /// screenshot, chat_log, photo, video, document, audio
    pub evidence_type: String,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_duration_hours() -> u32 {
    24
}

/// Action taken against the reported user when a report is resolved.
/// Durations are in hours and default to 24.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModerationAction {
    Warning {
        #[serde(default)]
        details: Option<String>,
    },
    RestrictMessaging {
        #[serde(default = "default_duration_hours", alias = "hours")]
        duration: u32,
    },
    RestrictPhotos {
        #[serde(default = "default_duration_hours", alias = "hours")]
        duration: u32,
    },
    SuspendAccount {
        #[serde(default = "default_duration_hours", alias = "hours")]
        duration: u32,
    },
    BanAccount {
        #[serde(default)]
        reason: String,
    },
}

/// A report filed by one member against another
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub id: ReportId,
    pub reporter_id: UserId,
    pub reported_user_id: UserId,
    pub category: ReportCategory,
    pub subcategory: Option<String>,
    pub description: String,
    pub severity: ReportSeverity,
    pub status: ReportStatus,
    pub evidence: Vec<EvidenceRef>,
    /// Last computed priority; refreshed by every transition and by recompute
    pub priority_score: i32,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub actions_taken: Vec<ModerationAction>,
    pub admin_notes: Option<String>,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
}

impl Report {
    /// A freshly filed report with a new id
    pub fn filed(new_report: NewReport, now: DateTime<Utc>) -> Self {
        Self {
            id: ReportId::new(),
            reporter_id: new_report.reporter_id,
            reported_user_id: new_report.reported_user_id,
            category: new_report.category,
            subcategory: new_report.subcategory,
            description: new_report.description,
            severity: new_report.severity,
            status: new_report.status,
            evidence: new_report.evidence,
            priority_score: new_report.priority_score,
            reviewed_by: None,
            reviewed_at: None,
            resolved_at: None,
            actions_taken: vec![],
            admin_notes: None,
            is_anonymous: new_report.is_anonymous,
            created_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Whole days since the report was filed
    pub fn days_since_created(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days().max(0)
    }

    pub fn priority_inputs(&self, target_report_count: u32, now: DateTime<Utc>) -> PriorityInputs {
        PriorityInputs {
            severity: self.severity,
            category: self.category,
            has_evidence: !self.evidence.is_empty(),
            target_report_count,
            days_since_created: self.days_since_created(now),
        }
    }

    /// Current priority for the given history, without touching the stored value
    pub fn compute_priority(&self, target_report_count: u32, now: DateTime<Utc>) -> i32 {
        let score = report_priority(&self.priority_inputs(target_report_count, now));
        if self.status == ReportStatus::Escalated {
            score.max(ESCALATION_PRIORITY_FLOOR)
        } else {
            score
        }
    }

    pub fn refresh_priority(&mut self, target_report_count: u32, now: DateTime<Utc>) {
        self.priority_score = self.compute_priority(target_report_count, now);
    }

    fn ensure_transition(&self, next: ReportStatus) -> Result<(), DomainError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(DomainError::invalid_transition("report", self.status, next))
        }
    }

    fn stamp_review(&mut self, status: ReportStatus, reviewer: UserId, now: DateTime<Utc>) {
        self.status = status;
        self.reviewed_by = Some(reviewer);
        self.reviewed_at = Some(now);
    }

    pub fn mark_under_review(
        &mut self,
        reviewer: UserId,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_transition(ReportStatus::UnderReview)?;
        self.stamp_review(ReportStatus::UnderReview, reviewer, now);
        Ok(())
    }

    pub fn mark_resolved(
        &mut self,
        reviewer: UserId,
        actions_taken: Vec<ModerationAction>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_transition(ReportStatus::Resolved)?;
        self.stamp_review(ReportStatus::Resolved, reviewer, now);
        self.resolved_at = Some(now);
        self.actions_taken = actions_taken;
        self.admin_notes = notes;
        Ok(())
    }

    pub fn mark_dismissed(
        &mut self,
        reviewer: UserId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_transition(ReportStatus::Dismissed)?;
        let reason = required_text(reason, "dismissal reason")?;
        self.stamp_review(ReportStatus::Dismissed, reviewer, now);
        self.resolved_at = Some(now);
        self.admin_notes = Some(reason);
        Ok(())
    }

    /// Escalation forces critical severity and lifts priority to the floor
    pub fn escalate(
        &mut self,
        reviewer: UserId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_transition(ReportStatus::Escalated)?;
        let reason = required_text(reason, "escalation reason")?;
        self.stamp_review(ReportStatus::Escalated, reviewer, now);
        self.severity = ReportSeverity::Critical;
        self.priority_score = self.priority_score.max(ESCALATION_PRIORITY_FLOOR);
        self.admin_notes = Some(reason);
        Ok(())
    }
}

pub(crate) fn required_text(value: &str, what: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(DomainError::Validation(format!("{} is required", what)))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Data needed to file a new report
#[derive(Debug, Clone)]
pub struct NewReport {
    pub reporter_id: UserId,
    pub reported_user_id: UserId,
    pub category: ReportCategory,
    pub subcategory: Option<String>,
    pub description: String,
    pub severity: ReportSeverity,
    pub status: ReportStatus,
    pub evidence: Vec<EvidenceRef>,
    pub priority_score: i32,
    pub is_anonymous: bool,
}

impl NewReport {
    pub fn is_self_report(&self) -> bool {
        self.reporter_id == self.reported_user_id
    }
}
