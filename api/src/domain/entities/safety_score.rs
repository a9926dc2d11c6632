//! Safety score domain entity
//!
//! One record per user tracking the incidents and feedback that drive their
//! trust score. The stored score is recomputed in the same write as every
//! counter change, so it never lags the counters it was derived from.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::user::{AccountStatus, UserId};
use crate::domain::scoring::{calculate_trust_score, ScoreBreakdown, TrustCounters, TrustScore};

/// Trust score below which a user is queued for manual review
pub const NEEDS_REVIEW_TRUST_THRESHOLD: i32 = 60;
/// Verified reports at which a user is queued for manual review
pub const NEEDS_REVIEW_VERIFIED_REPORTS: u32 = 3;
/// Community flags at which a user is queued for manual review
pub const NEEDS_REVIEW_COMMUNITY_FLAGS: u32 = 5;

/// Risk bucket derived from the trust score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskCategory {
    pub fn from_trust_score(score: i32) -> Self {
        match score {
            80.. => RiskCategory::Low,
            60..=79 => RiskCategory::Medium,
            40..=59 => RiskCategory::High,
            _ => RiskCategory::Critical,
        }
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskCategory::Low => write!(f, "low"),
            RiskCategory::Medium => write!(f, "medium"),
            RiskCategory::High => write!(f, "high"),
            RiskCategory::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for RiskCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(RiskCategory::Low),
            "medium" => Ok(RiskCategory::Medium),
            "high" => Ok(RiskCategory::High),
            "critical" => Ok(RiskCategory::Critical),
            _ => Err(format!("Unknown risk category: {}", s)),
        }
    }
}

/// Finer-grained trust label shown to moderators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    Excellent,
    VeryGood,
    Good,
    Fair,
    Poor,
    VeryPoor,
}

impl TrustLevel {
    pub fn from_trust_score(score: i32) -> Self {
        match score {
            90.. => TrustLevel::Excellent,
            80..=89 => TrustLevel::VeryGood,
            70..=79 => TrustLevel::Good,
            60..=69 => TrustLevel::Fair,
            40..=59 => TrustLevel::Poor,
            _ => TrustLevel::VeryPoor,
        }
    }
}

/// How urgent a recommended action is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionPriority {
    Low,
    Medium,
    High,
}

/// Kind of follow-up suggested to moderators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedActionKind {
    AccountRestriction,
    ManualReview,
    CommunityWarning,
    TrustedUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecommendedAction {
    pub action: RecommendedActionKind,
    pub priority: ActionPriority,
    pub description: &'static str,
}

/// A user's safety record
#[derive(Debug, Clone, Serialize)]
pub struct SafetyScore {
    pub user_id: UserId,
    pub trust_score: i32,
    pub report_count: u32,
    pub verified_report_count: u32,
    pub false_report_count: u32,
    pub community_flags: u32,
    pub positive_feedback: u32,
    pub last_incident_date: Option<NaiveDate>,
    pub risk_category: RiskCategory,
    pub score_breakdown: ScoreBreakdown,
    pub last_calculated_at: DateTime<Utc>,
    /// Row version for conditional writes; 0 until first stored
    #[serde(skip)]
    pub version: i64,
}

impl SafetyScore {
    /// A clean record for a user without history
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            trust_score: 100,
            report_count: 0,
            verified_report_count: 0,
            false_report_count: 0,
            community_flags: 0,
            positive_feedback: 0,
            last_incident_date: None,
            risk_category: RiskCategory::Low,
            score_breakdown: ScoreBreakdown::default(),
            last_calculated_at: now,
            version: 0,
        }
    }

    pub fn counters(&self) -> TrustCounters {
        TrustCounters {
            verified_report_count: self.verified_report_count,
            community_flags: self.community_flags,
            positive_feedback: self.positive_feedback,
            false_report_count: self.false_report_count,
            last_incident_date: self.last_incident_date,
        }
    }

    /// Score for the current counters, leaving the stored values alone
    pub fn calculate(&self, now: DateTime<Utc>) -> TrustScore {
        calculate_trust_score(&self.counters(), now.date_naive())
    }

    /// Recompute and store the trust score, risk category and breakdown
    pub fn recalculate(&mut self, now: DateTime<Utc>) -> TrustScore {
        let result = self.calculate(now);
        self.trust_score = result.trust_score;
        self.risk_category = result.risk_category;
        self.score_breakdown = result.breakdown;
        self.last_calculated_at = now;
        result
    }

    pub fn record_report(&mut self, verified: bool, now: DateTime<Utc>) -> TrustScore {
        self.report_count = self.report_count.saturating_add(1);
        if verified {
            self.verified_report_count = self.verified_report_count.saturating_add(1);
        }
        self.last_incident_date = Some(now.date_naive());
        self.recalculate(now)
    }

    /// A report already counted at submission was upheld on review
    pub fn confirm_report(&mut self, now: DateTime<Utc>) -> TrustScore {
        self.verified_report_count = self.verified_report_count.saturating_add(1);
        self.last_incident_date = Some(now.date_naive());
        self.recalculate(now)
    }

    pub fn record_community_flag(&mut self, now: DateTime<Utc>) -> TrustScore {
        self.community_flags = self.community_flags.saturating_add(1);
        self.last_incident_date = Some(now.date_naive());
        self.recalculate(now)
    }

    /// Positive feedback is not an incident and leaves the incident date alone
    pub fn record_positive_feedback(&mut self, now: DateTime<Utc>) -> TrustScore {
        self.positive_feedback = self.positive_feedback.saturating_add(1);
        self.recalculate(now)
    }

    /// The user filed a report that was dismissed
    pub fn record_false_report(&mut self, now: DateTime<Utc>) -> TrustScore {
        self.false_report_count = self.false_report_count.saturating_add(1);
        self.last_incident_date = Some(now.date_naive());
        self.recalculate(now)
    }

    pub fn days_since_last_incident(&self, now: DateTime<Utc>) -> Option<i64> {
        self.last_incident_date
            .map(|d| (now.date_naive() - d).num_days())
    }

    pub fn trust_level(&self) -> TrustLevel {
        TrustLevel::from_trust_score(self.trust_score)
    }

    pub fn is_high_risk(&self) -> bool {
        matches!(self.risk_category, RiskCategory::High | RiskCategory::Critical)
    }

    pub fn needs_review(&self) -> bool {
        self.trust_score < NEEDS_REVIEW_TRUST_THRESHOLD
            || self.verified_report_count >= NEEDS_REVIEW_VERIFIED_REPORTS
            || self.community_flags >= NEEDS_REVIEW_COMMUNITY_FLAGS
    }

    /// Account standing implied by this record
    pub fn account_status(&self) -> AccountStatus {
        match self.trust_score {
            ..=19 => AccountStatus::Banned,
            20..=39 => AccountStatus::Suspended,
            40..=59 => AccountStatus::Restricted,
            _ if self.verified_report_count >= NEEDS_REVIEW_VERIFIED_REPORTS => {
                AccountStatus::Warning
            }
            _ => AccountStatus::Active,
        }
    }

    pub fn recommended_actions(&self) -> Vec<RecommendedAction> {
        let mut actions = Vec::new();

        if self.trust_score < 40 {
            actions.push(RecommendedAction {
                action: RecommendedActionKind::AccountRestriction,
                priority: ActionPriority::High,
                description: "Consider restricting account features",
            });
        }

        if self.verified_report_count >= 5 {
            actions.push(RecommendedAction {
                action: RecommendedActionKind::ManualReview,
                priority: ActionPriority::High,
                description: "Requires immediate manual review",
            });
        }

        if self.community_flags >= 10 {
            actions.push(RecommendedAction {
                action: RecommendedActionKind::CommunityWarning,
                priority: ActionPriority::Medium,
                description: "Issue community guidelines warning",
            });
        }

        if self.trust_score >= 80 && self.positive_feedback >= 10 {
            actions.push(RecommendedAction {
                action: RecommendedActionKind::TrustedUser,
                priority: ActionPriority::Low,
                description: "Consider for trusted user program",
            });
        }

        actions
    }
}
