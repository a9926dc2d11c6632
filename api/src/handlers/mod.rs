//! HTTP handlers
//!
//! Axum request handlers for the admin API endpoints.

use serde::Deserialize;

pub mod badges;
pub mod panics;
pub mod reports;
pub mod safety;
pub mod verifications;

pub use badges::{
    list_for_user as list_user_badges, reject as reject_badge, renew as renew_badge,
    request_badge, verify as verify_badge,
};
pub use panics::{
    escalate as escalate_panic, get as get_panic, open_queue as open_panics,
    resolve as resolve_panic, trigger as trigger_panic,
};
pub use reports::{
    dashboard as report_dashboard, get_report, recompute_priority, review_queue, review_report,
    submit_report,
};
pub use safety::{
    get_overview as get_safety_overview, needs_review as safety_needs_review,
    recalculate as recalculate_safety, record_event as record_safety_event,
};
pub use verifications::{
    approve as approve_verification, get as get_verification,
    needs_review as verification_needs_review, reject as reject_verification,
    submit as submit_verification,
};

const DEFAULT_LIMIT: u64 = 50;
const MAX_LIMIT: u64 = 200;

/// Query parameters for list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<u64>,
}

impl LimitQuery {
    pub fn clamped(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// Body for transitions that need a reason
#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    pub reason: String,
}
