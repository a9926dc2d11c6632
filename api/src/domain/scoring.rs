//! Moderation scoring
//!
//! Two pure calculations back the moderation queues:
//!
//! - the **trust score**, a bounded 0-100 value per user derived from their
//!   incident and feedback counters, bucketed into a risk category;
//! - the **report priority**, an unbounded relative ranking signal per report.
//!   Higher means more urgent. It is not a percentage and is never clamped, so
//!   it must not be compared against trust scores.
//!
//! Neither function performs I/O or reads the clock; callers pass `today`/`now`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::entities::{ReportCategory, ReportSeverity, RiskCategory};

/// Starting trust score before adjustments
pub const TRUST_BASE: i32 = 100;

/// Penalty per verified report against the user
pub const VERIFIED_REPORT_PENALTY: i64 = 15;
pub const MAX_VERIFIED_REPORT_PENALTY: i64 = 60;

/// Penalty per community flag
pub const COMMUNITY_FLAG_PENALTY: i64 = 5;
pub const MAX_COMMUNITY_FLAG_PENALTY: i64 = 20;

/// Bonus per positive feedback
pub const POSITIVE_FEEDBACK_BONUS: i64 = 2;
pub const MAX_POSITIVE_FEEDBACK_BONUS: i64 = 15;

/// Penalty per false report the user filed
pub const FALSE_REPORT_PENALTY: i64 = 3;
pub const MAX_FALSE_REPORT_PENALTY: i64 = 10;

/// Incident-free days before time recovery starts
pub const RECOVERY_THRESHOLD_DAYS: i64 = 90;
/// One recovery point per this many incident-free days
pub const RECOVERY_PERIOD_DAYS: i64 = 30;
pub const MAX_RECOVERY_BONUS: i64 = 10;

/// Priority bonus when a report carries evidence
pub const EVIDENCE_BONUS: i32 = 2;
/// Cap on the bonus for prior reports against the same user
pub const MAX_HISTORY_BONUS: u32 = 5;
/// One age point per this many days waiting
pub const AGE_BONUS_PERIOD_DAYS: i64 = 3;
pub const MAX_AGE_BONUS: i64 = 3;

/// Minimum priority of an escalated report
pub const ESCALATION_PRIORITY_FLOOR: i32 = 10;

/// Counters feeding the trust score
///
/// Counts are unsigned: negative counters are rejected where they enter the
/// system (see the PostgreSQL adapter) rather than inside the calculation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrustCounters {
    pub verified_report_count: u32,
    pub community_flags: u32,
    pub positive_feedback: u32,
    pub false_report_count: u32,
    pub last_incident_date: Option<NaiveDate>,
}

/// Signed contribution of each factor to the trust score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub verified_reports: i32,
    pub community_flags: i32,
    pub positive_feedback: i32,
    pub false_reports_made: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_recovery: Option<i32>,
}

/// Result of a trust score calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrustScore {
    pub trust_score: i32,
    pub risk_category: RiskCategory,
    pub breakdown: ScoreBreakdown,
}

fn capped(count: u32, per_unit: i64, max: i64) -> i32 {
    // Both operands fit in i64 and `max` is small, so the result fits in i32.
    (i64::from(count) * per_unit).min(max) as i32
}

/// Compute a user's trust score from their counters
pub fn calculate_trust_score(counters: &TrustCounters, today: NaiveDate) -> TrustScore {
    let mut breakdown = ScoreBreakdown {
        verified_reports: -capped(
            counters.verified_report_count,
            VERIFIED_REPORT_PENALTY,
            MAX_VERIFIED_REPORT_PENALTY,
        ),
        community_flags: -capped(
            counters.community_flags,
            COMMUNITY_FLAG_PENALTY,
            MAX_COMMUNITY_FLAG_PENALTY,
        ),
        positive_feedback: capped(
            counters.positive_feedback,
            POSITIVE_FEEDBACK_BONUS,
            MAX_POSITIVE_FEEDBACK_BONUS,
        ),
        false_reports_made: -capped(
            counters.false_report_count,
            FALSE_REPORT_PENALTY,
            MAX_FALSE_REPORT_PENALTY,
        ),
        time_recovery: None,
    };

    if let Some(last_incident) = counters.last_incident_date {
        let days = (today - last_incident).num_days();
        if days > RECOVERY_THRESHOLD_DAYS {
            breakdown.time_recovery =
                Some((days / RECOVERY_PERIOD_DAYS).min(MAX_RECOVERY_BONUS) as i32);
        }
    }

    let raw = TRUST_BASE
        + breakdown.verified_reports
        + breakdown.community_flags
        + breakdown.positive_feedback
        + breakdown.false_reports_made
        + breakdown.time_recovery.unwrap_or(0);
    let trust_score = raw.clamp(0, 100);

    TrustScore {
        trust_score,
        risk_category: RiskCategory::from_trust_score(trust_score),
        breakdown,
    }
}

/// Inputs to the report priority calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityInputs {
    pub severity: ReportSeverity,
    pub category: ReportCategory,
    pub has_evidence: bool,
    /// Other reports filed against the same user
    pub target_report_count: u32,
    pub days_since_created: i64,
}

/// Compute a report's priority score
pub fn report_priority(inputs: &PriorityInputs) -> i32 {
    let mut score = inputs.severity.base_score() + inputs.category.priority_weight();

    if inputs.has_evidence {
        score += EVIDENCE_BONUS;
    }

    if inputs.target_report_count > 1 {
        score += inputs.target_report_count.min(MAX_HISTORY_BONUS) as i32;
    }

    if inputs.days_since_created > AGE_BONUS_PERIOD_DAYS {
        score += (inputs.days_since_created / AGE_BONUS_PERIOD_DAYS).min(MAX_AGE_BONUS) as i32;
    }

    score
}
