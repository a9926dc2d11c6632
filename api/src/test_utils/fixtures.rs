//! Test fixtures
//!
//! Factory functions for creating test data with sensible defaults.
//! Each fixture function creates a valid entity that can be customized.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::app::{ReportSubmission, ReportingService, SafetyService, VerificationService};
use crate::domain::entities::{
    BadgeId, BadgeStatus, BadgeType, DocumentSubmission, PanicActivation, PanicActivationId,
    PanicStatus, Report, ReportCategory, ReportId, ReportSeverity, ReportStatus, TriggerType,
    UserId, VerifiedBadge,
};
use crate::test_utils::mocks::{
    InMemoryModerationStore, InMemoryReportRepository, InMemorySafetyScoreRepository,
    InMemoryUserRepository, InMemoryVerificationRequestRepository,
    InMemoryVerifiedBadgeRepository, MockNotifier,
};

/// Default priority threshold used by service fixtures
pub const TEST_HIGH_PRIORITY_THRESHOLD: i32 = 15;
/// Default duplicate report window used by service fixtures
pub const TEST_DUPLICATE_WINDOW_DAYS: i64 = 7;

/// A submission from a fresh reporter against a fresh user
pub fn submission(category: ReportCategory) -> ReportSubmission {
    ReportSubmission {
        reporter_id: UserId::new(),
        reported_user_id: UserId::new(),
        category,
        subcategory: None,
        description: format!("Reported for {}", category),
        severity: None,
        evidence: vec![],
        is_anonymous: false,
    }
}

/// A stored report, filed a day ago
pub fn report(status: ReportStatus) -> Report {
    Report {
        id: ReportId::new(),
        reporter_id: UserId::new(),
        reported_user_id: UserId::new(),
        category: ReportCategory::Harassment,
        subcategory: None,
        description: "Kept messaging after being blocked".to_string(),
        severity: ReportSeverity::High,
        status,
        evidence: vec![],
        priority_score: 14,
        reviewed_by: None,
        reviewed_at: None,
        resolved_at: None,
        actions_taken: vec![],
        admin_notes: None,
        is_anonymous: false,
        created_at: Utc::now() - Duration::days(1),
    }
}

/// Documents keyed by kind, each with a plausible storage path
pub fn documents(kinds: &[&str]) -> BTreeMap<String, DocumentSubmission> {
    kinds
        .iter()
        .map(|kind| {
            (
                kind.to_string(),
                DocumentSubmission {
                    path: format!("verifications/test/{}.jpg", kind),
                    name: Some(format!("{}.jpg", kind)),
                    mime_type: Some("image/jpeg".to_string()),
                },
            )
        })
        .collect()
}

/// An active panic triggered at the given time
pub fn panic(trigger_type: TriggerType, triggered_at: DateTime<Utc>) -> PanicActivation {
    PanicActivation {
        id: PanicActivationId::new(),
        user_id: UserId::new(),
        trigger_type,
        status: PanicStatus::Active,
        user_message: None,
        location_address: None,
        triggered_at,
        resolved_at: None,
        resolved_by: None,
        resolution_notes: None,
        authorities_contacted: false,
    }
}

/// A badge in the given status; verified badges carry the type's default expiry
pub fn badge(badge_type: BadgeType, status: BadgeStatus) -> VerifiedBadge {
    let now = Utc::now();
    let verified = status == BadgeStatus::Verified;
    VerifiedBadge {
        id: BadgeId::new(),
        user_id: UserId::new(),
        badge_type,
        status,
        admin_notes: None,
        verified_at: verified.then_some(now),
        expires_at: if verified {
            badge_type.default_expiry(now)
        } else {
            None
        },
        verified_by: verified.then(UserId::new),
    }
}

pub type TestSafetyService = SafetyService<
    InMemorySafetyScoreRepository,
    InMemoryUserRepository,
    InMemoryModerationStore,
    MockNotifier,
>;

pub type TestReportingService = ReportingService<
    InMemoryReportRepository,
    InMemorySafetyScoreRepository,
    InMemoryUserRepository,
    InMemoryModerationStore,
    MockNotifier,
>;

pub type TestVerificationService = VerificationService<
    InMemoryVerificationRequestRepository,
    InMemoryVerifiedBadgeRepository,
    InMemoryModerationStore,
    MockNotifier,
>;

/// Safety service committing through a store over the given repositories
pub fn safety_service(
    scores: Arc<InMemorySafetyScoreRepository>,
    users: Arc<InMemoryUserRepository>,
    notifier: Arc<MockNotifier>,
) -> TestSafetyService {
    let store = InMemoryModerationStore::new()
        .with_scores(scores.clone())
        .with_users(users.clone());
    SafetyService::new(scores, users, Arc::new(store), notifier)
}

/// Reporting service over shared in-memory stores with default thresholds
pub fn reporting_service(
    reports: Arc<InMemoryReportRepository>,
    scores: Arc<InMemorySafetyScoreRepository>,
    users: Arc<InMemoryUserRepository>,
    notifier: Arc<MockNotifier>,
) -> TestReportingService {
    let store = InMemoryModerationStore::new()
        .with_reports(reports.clone())
        .with_scores(scores.clone())
        .with_users(users.clone());
    let safety = Arc::new(SafetyService::new(
        scores,
        users,
        Arc::new(store),
        notifier.clone(),
    ));
    ReportingService::new(
        reports,
        safety,
        notifier,
        TEST_DUPLICATE_WINDOW_DAYS,
        TEST_HIGH_PRIORITY_THRESHOLD,
    )
}

pub fn verification_service(
    requests: Arc<InMemoryVerificationRequestRepository>,
    badges: Arc<InMemoryVerifiedBadgeRepository>,
    notifier: Arc<MockNotifier>,
    require_complete_documents: bool,
) -> TestVerificationService {
    let store = InMemoryModerationStore::new()
        .with_verifications(requests.clone())
        .with_badges(badges.clone());
    VerificationService::new(
        requests,
        badges,
        Arc::new(store),
        notifier,
        require_complete_documents,
    )
}
