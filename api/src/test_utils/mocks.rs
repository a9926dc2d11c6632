//! Mock implementations of port traits
//!
//! In-memory repositories with the same conditional-write semantics as the
//! PostgreSQL adapters, a moderation store that commits a batch over them
//! all-or-nothing, plus a notifier that records what it was sent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::domain::entities::{
    BadgeId, BadgeStatus, ModeratedUser, NewPanicActivation, NewVerifiedBadge, PanicActivation,
    PanicActivationId, PanicStatus, Report, ReportId, ReportSeverity, ReportStatus, SafetyScore,
    UserId, VerificationRequest, VerificationRequestId, VerificationStatus, VerificationType,
    VerifiedBadge,
};
use crate::domain::ports::{
    ModerationEvent, ModerationStore, ModerationWrites, Notifier, PanicActivationRepository,
    ReportRepository, SafetyScoreRepository, StagedWrite, UserRepository,
    VerificationRequestRepository, VerifiedBadgeRepository,
};
use crate::error::{DomainError, NotificationError};

// ============================================================================
// In-Memory Report Repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryReportRepository {
    reports: Arc<RwLock<HashMap<ReportId, Report>>>,
    fail_next_transition: AtomicBool,
}

impl InMemoryReportRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_report(self, report: Report) -> Self {
        self.reports.write().unwrap().insert(report.id, report);
        self
    }

    pub fn get(&self, id: &ReportId) -> Option<Report> {
        self.reports.read().unwrap().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.reports.read().unwrap().len()
    }

    /// Make the next committed transition behave as if another admin moved
    /// the report first
    pub fn fail_next_transition(&self) {
        self.fail_next_transition.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReportRepository for InMemoryReportRepository {
    async fn find_by_id(&self, id: &ReportId) -> Result<Option<Report>, DomainError> {
        Ok(self.get(id))
    }

    async fn update_priority(
        &self,
        id: &ReportId,
        priority_score: i32,
    ) -> Result<(), DomainError> {
        let mut reports = self.reports.write().unwrap();
        let report = reports
            .get_mut(id)
            .ok_or_else(|| DomainError::NotFound(format!("Report {}", id)))?;
        report.priority_score = priority_score;
        Ok(())
    }

    async fn count_against_user(
        &self,
        user_id: &UserId,
        excluding: Option<&ReportId>,
    ) -> Result<u32, DomainError> {
        let reports = self.reports.read().unwrap();
        Ok(reports
            .values()
            .filter(|r| r.reported_user_id == *user_id)
            .filter(|r| excluding.map_or(true, |id| r.id != *id))
            .count() as u32)
    }

    async fn exists_from_reporter_since(
        &self,
        reporter_id: &UserId,
        reported_user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let reports = self.reports.read().unwrap();
        Ok(reports.values().any(|r| {
            r.reporter_id == *reporter_id
                && r.reported_user_id == *reported_user_id
                && r.created_at >= since
        }))
    }

    async fn find_open_by_priority(&self, limit: u64) -> Result<Vec<Report>, DomainError> {
        let reports = self.reports.read().unwrap();
        let mut open: Vec<Report> = reports.values().filter(|r| r.is_open()).cloned().collect();
        open.sort_by(|a, b| {
            b.priority_score
                .cmp(&a.priority_score)
                .then(a.created_at.cmp(&b.created_at))
        });
        open.truncate(limit as usize);
        Ok(open)
    }

    async fn count_by_status(&self) -> Result<Vec<(ReportStatus, u64)>, DomainError> {
        let reports = self.reports.read().unwrap();
        let mut counts: HashMap<ReportStatus, u64> = HashMap::new();
        for report in reports.values() {
            *counts.entry(report.status).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn count_by_severity(&self) -> Result<Vec<(ReportSeverity, u64)>, DomainError> {
        let reports = self.reports.read().unwrap();
        let mut counts: HashMap<ReportSeverity, u64> = HashMap::new();
        for report in reports.values() {
            *counts.entry(report.severity).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn count_pending_with_priority_at_least(
        &self,
        threshold: i32,
    ) -> Result<u64, DomainError> {
        let reports = self.reports.read().unwrap();
        Ok(reports
            .values()
            .filter(|r| r.status == ReportStatus::Pending && r.priority_score >= threshold)
            .count() as u64)
    }
}

// ============================================================================
// In-Memory Safety Score Repository
// ============================================================================

#[derive(Default)]
pub struct InMemorySafetyScoreRepository {
    scores: Arc<RwLock<HashMap<UserId, SafetyScore>>>,
    yield_after_read: AtomicBool,
}

impl InMemorySafetyScoreRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a stored score; seeded rows start at version 1 like fresh database rows
    pub fn with_score(self, mut score: SafetyScore) -> Self {
        score.version = score.version.max(1);
        self.scores.write().unwrap().insert(score.user_id, score);
        self
    }

    /// Hand control back to the runtime after every read, so concurrent
    /// callers interleave between read and commit
    pub fn yield_after_read(&self) {
        self.yield_after_read.store(true, Ordering::SeqCst);
    }

    pub fn get(&self, user_id: &UserId) -> Option<SafetyScore> {
        self.scores.read().unwrap().get(user_id).cloned()
    }
}

#[async_trait]
impl SafetyScoreRepository for InMemorySafetyScoreRepository {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<SafetyScore>, DomainError> {
        let score = self.get(user_id);
        if self.yield_after_read.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        Ok(score)
    }

    async fn find_needs_review(&self, limit: u64) -> Result<Vec<SafetyScore>, DomainError> {
        let scores = self.scores.read().unwrap();
        let mut flagged: Vec<SafetyScore> = scores
            .values()
            .filter(|s| s.needs_review())
            .cloned()
            .collect();
        flagged.sort_by_key(|s| s.trust_score);
        flagged.truncate(limit as usize);
        Ok(flagged)
    }
}

// ============================================================================
// In-Memory User Repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<UserId, ModeratedUser>>>,
    yield_after_read: AtomicBool,
    fail_next_write: AtomicBool,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a stored user; seeded rows start at version 1 like fresh database rows
    pub fn with_user(self, mut user: ModeratedUser) -> Self {
        user.version = user.version.max(1);
        self.users.write().unwrap().insert(user.id, user);
        self
    }

    pub fn yield_after_read(&self) {
        self.yield_after_read.store(true, Ordering::SeqCst);
    }

    /// Fail the next committed user write as a dropped connection would
    pub fn fail_next_write(&self) {
        self.fail_next_write.store(true, Ordering::SeqCst);
    }

    pub fn get(&self, id: &UserId) -> Option<ModeratedUser> {
        self.users.read().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<ModeratedUser>, DomainError> {
        let user = self.get(id);
        if self.yield_after_read.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        Ok(user)
    }
}

// ============================================================================
// In-Memory Verification Request Repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryVerificationRequestRepository {
    requests: Arc<RwLock<HashMap<VerificationRequestId, VerificationRequest>>>,
}

impl InMemoryVerificationRequestRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request(self, request: VerificationRequest) -> Self {
        self.requests.write().unwrap().insert(request.id, request);
        self
    }

    pub fn get(&self, id: &VerificationRequestId) -> Option<VerificationRequest> {
        self.requests.read().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl VerificationRequestRepository for InMemoryVerificationRequestRepository {
    async fn find_by_id(
        &self,
        id: &VerificationRequestId,
    ) -> Result<Option<VerificationRequest>, DomainError> {
        Ok(self.get(id))
    }

    async fn has_open_request(
        &self,
        user_id: &UserId,
        verification_type: VerificationType,
    ) -> Result<bool, DomainError> {
        let requests = self.requests.read().unwrap();
        Ok(has_open_request(&requests, user_id, verification_type))
    }

    async fn update_transition(
        &self,
        request: &VerificationRequest,
        expected: VerificationStatus,
    ) -> Result<(), DomainError> {
        let mut requests = self.requests.write().unwrap();
        transition_request(&mut requests, request, expected)
    }
}

fn transition_request(
    requests: &mut HashMap<VerificationRequestId, VerificationRequest>,
    request: &VerificationRequest,
    expected: VerificationStatus,
) -> Result<(), DomainError> {
    match requests.get(&request.id) {
        None => Err(DomainError::NotFound(format!(
            "Verification request {}",
            request.id
        ))),
        Some(current) if current.status != expected => Err(DomainError::Conflict(format!(
            "Verification request {} is no longer {} (now {})",
            request.id, expected, current.status
        ))),
        Some(_) => {
            requests.insert(request.id, request.clone());
            Ok(())
        }
    }
}

fn has_open_request(
    requests: &HashMap<VerificationRequestId, VerificationRequest>,
    user_id: &UserId,
    verification_type: VerificationType,
) -> bool {
    requests.values().any(|r| {
        r.user_id == *user_id && r.verification_type == verification_type && r.status.is_open()
    })
}

// ============================================================================
// In-Memory Panic Activation Repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryPanicActivationRepository {
    panics: Arc<RwLock<HashMap<PanicActivationId, PanicActivation>>>,
}

impl InMemoryPanicActivationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_panic(self, panic: PanicActivation) -> Self {
        self.panics.write().unwrap().insert(panic.id, panic);
        self
    }

    pub fn get(&self, id: &PanicActivationId) -> Option<PanicActivation> {
        self.panics.read().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl PanicActivationRepository for InMemoryPanicActivationRepository {
    async fn find_by_id(
        &self,
        id: &PanicActivationId,
    ) -> Result<Option<PanicActivation>, DomainError> {
        Ok(self.get(id))
    }

    async fn create(&self, new_panic: &NewPanicActivation) -> Result<PanicActivation, DomainError> {
        let mut panics = self.panics.write().unwrap();
        if let Some(open) = open_panic_for(&panics, &new_panic.user_id) {
            return Err(DomainError::Conflict(format!(
                "Panic button is already active (panic {})",
                open.id
            )));
        }
        let panic = PanicActivation {
            id: PanicActivationId::new(),
            user_id: new_panic.user_id,
            trigger_type: new_panic.trigger_type,
            status: PanicStatus::Active,
            user_message: new_panic.user_message.clone(),
            location_address: new_panic.location_address.clone(),
            triggered_at: Utc::now(),
            resolved_at: None,
            resolved_by: None,
            resolution_notes: None,
            authorities_contacted: false,
        };
        panics.insert(panic.id, panic.clone());
        Ok(panic)
    }

    async fn find_open_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<PanicActivation>, DomainError> {
        let panics = self.panics.read().unwrap();
        Ok(open_panic_for(&panics, user_id).cloned())
    }

    async fn update_transition(
        &self,
        panic: &PanicActivation,
        expected: PanicStatus,
    ) -> Result<(), DomainError> {
        let mut panics = self.panics.write().unwrap();
        match panics.get(&panic.id) {
            None => Err(DomainError::NotFound(format!(
                "Panic activation {}",
                panic.id
            ))),
            Some(current) if current.status != expected => Err(DomainError::Conflict(format!(
                "Panic activation {} is no longer {} (now {})",
                panic.id, expected, current.status
            ))),
            Some(_) => {
                panics.insert(panic.id, panic.clone());
                Ok(())
            }
        }
    }

    async fn find_open(&self) -> Result<Vec<PanicActivation>, DomainError> {
        let panics = self.panics.read().unwrap();
        let mut open: Vec<PanicActivation> = panics
            .values()
            .filter(|p| !p.status.is_resolved())
            .cloned()
            .collect();
        open.sort_by_key(|p| p.triggered_at);
        Ok(open)
    }
}

fn open_panic_for<'a>(
    panics: &'a HashMap<PanicActivationId, PanicActivation>,
    user_id: &UserId,
) -> Option<&'a PanicActivation> {
    panics
        .values()
        .find(|p| p.user_id == *user_id && !p.status.is_resolved())
}

// ============================================================================
// In-Memory Verified Badge Repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryVerifiedBadgeRepository {
    badges: Arc<RwLock<HashMap<BadgeId, VerifiedBadge>>>,
}

impl InMemoryVerifiedBadgeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_badge(self, badge: VerifiedBadge) -> Self {
        self.badges.write().unwrap().insert(badge.id, badge);
        self
    }

    pub fn get(&self, id: &BadgeId) -> Option<VerifiedBadge> {
        self.badges.read().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl VerifiedBadgeRepository for InMemoryVerifiedBadgeRepository {
    async fn find_by_id(&self, id: &BadgeId) -> Result<Option<VerifiedBadge>, DomainError> {
        Ok(self.get(id))
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<VerifiedBadge>, DomainError> {
        let badges = self.badges.read().unwrap();
        let mut owned: Vec<VerifiedBadge> = badges
            .values()
            .filter(|b| b.user_id == *user_id)
            .cloned()
            .collect();
        owned.sort_by_key(|b| b.badge_type.to_string());
        Ok(owned)
    }

    async fn create(&self, new_badge: &NewVerifiedBadge) -> Result<VerifiedBadge, DomainError> {
        let badge = VerifiedBadge::requested(new_badge.clone());
        self.badges
            .write()
            .unwrap()
            .insert(badge.id, badge.clone());
        Ok(badge)
    }

    async fn update_transition(
        &self,
        badge: &VerifiedBadge,
        expected: BadgeStatus,
    ) -> Result<(), DomainError> {
        let mut badges = self.badges.write().unwrap();
        transition_badge(&mut badges, badge, expected)
    }
}

fn transition_badge(
    badges: &mut HashMap<BadgeId, VerifiedBadge>,
    badge: &VerifiedBadge,
    expected: BadgeStatus,
) -> Result<(), DomainError> {
    match badges.get(&badge.id) {
        None => Err(DomainError::NotFound(format!("Badge {}", badge.id))),
        Some(current) if current.status != expected => Err(DomainError::Conflict(format!(
            "Badge {} is no longer {} (now {})",
            badge.id, expected, current.status
        ))),
        Some(_) => {
            badges.insert(badge.id, badge.clone());
            Ok(())
        }
    }
}

// ============================================================================
// In-Memory Moderation Store
// ============================================================================

/// Commits batches over the maps of the in-memory repositories it was built
/// with. Writes land on copies that replace the stored maps only once every
/// write in the batch went through.
#[derive(Clone, Default)]
pub struct InMemoryModerationStore {
    reports: Arc<InMemoryReportRepository>,
    scores: Arc<InMemorySafetyScoreRepository>,
    users: Arc<InMemoryUserRepository>,
    verifications: Arc<InMemoryVerificationRequestRepository>,
    badges: Arc<InMemoryVerifiedBadgeRepository>,
}

impl InMemoryModerationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reports(mut self, reports: Arc<InMemoryReportRepository>) -> Self {
        self.reports = reports;
        self
    }

    pub fn with_scores(mut self, scores: Arc<InMemorySafetyScoreRepository>) -> Self {
        self.scores = scores;
        self
    }

    pub fn with_users(mut self, users: Arc<InMemoryUserRepository>) -> Self {
        self.users = users;
        self
    }

    pub fn with_verifications(
        mut self,
        verifications: Arc<InMemoryVerificationRequestRepository>,
    ) -> Self {
        self.verifications = verifications;
        self
    }

    pub fn with_badges(mut self, badges: Arc<InMemoryVerifiedBadgeRepository>) -> Self {
        self.badges = badges;
        self
    }

    fn apply(&self, tables: &mut Tables, write: &StagedWrite) -> Result<(), DomainError> {
        match write {
            StagedWrite::InsertReport(report) => {
                if tables.reports.contains_key(&report.id) {
                    return Err(DomainError::Conflict(format!(
                        "Report {} already exists",
                        report.id
                    )));
                }
                tables.reports.insert(report.id, report.clone());
            }
            StagedWrite::ReportTransition { report, expected } => {
                if self.reports.fail_next_transition.swap(false, Ordering::SeqCst) {
                    return Err(DomainError::Conflict(format!(
                        "Report {} is no longer {}",
                        report.id, expected
                    )));
                }
                match tables.reports.get(&report.id) {
                    None => return Err(DomainError::NotFound(format!("Report {}", report.id))),
                    Some(current) if current.status != *expected => {
                        return Err(DomainError::Conflict(format!(
                            "Report {} is no longer {} (now {})",
                            report.id, expected, current.status
                        )))
                    }
                    Some(_) => {
                        tables.reports.insert(report.id, report.clone());
                    }
                }
            }
            StagedWrite::Score(score) => {
                check_version(
                    tables.scores.get(&score.user_id).map(|s| s.version),
                    score.version,
                    format!("Safety score for {}", score.user_id),
                )?;
                let mut stored = score.clone();
                stored.version += 1;
                tables.scores.insert(stored.user_id, stored);
            }
            StagedWrite::User(user) => {
                if self.users.fail_next_write.swap(false, Ordering::SeqCst) {
                    return Err(DomainError::Database("connection reset".into()));
                }
                check_version(
                    tables.users.get(&user.id).map(|u| u.version),
                    user.version,
                    format!("User {}", user.id),
                )?;
                let mut stored = user.clone();
                stored.version += 1;
                tables.users.insert(stored.id, stored);
            }
            StagedWrite::InsertVerification(request) => {
                if has_open_request(&tables.requests, &request.user_id, request.verification_type)
                {
                    return Err(DomainError::Conflict(
                        "You already have a pending verification request for this type".into(),
                    ));
                }
                tables.requests.insert(request.id, request.clone());
            }
            StagedWrite::VerificationTransition { request, expected } => {
                transition_request(&mut tables.requests, request, *expected)?
            }
            StagedWrite::InsertBadge(badge) => {
                tables.badges.insert(badge.id, badge.clone());
            }
            StagedWrite::BadgeTransition { badge, expected } => {
                transition_badge(&mut tables.badges, badge, *expected)?
            }
        }
        Ok(())
    }
}

/// Working copies of every map a batch may touch
struct Tables {
    reports: HashMap<ReportId, Report>,
    scores: HashMap<UserId, SafetyScore>,
    users: HashMap<UserId, ModeratedUser>,
    requests: HashMap<VerificationRequestId, VerificationRequest>,
    badges: HashMap<BadgeId, VerifiedBadge>,
}

/// Version 0 inserts a new row; any other version must match the stored one
fn check_version(stored: Option<i64>, staged: i64, row: String) -> Result<(), DomainError> {
    match (stored, staged) {
        (None, 0) => Ok(()),
        (Some(_), 0) => Err(DomainError::ConcurrentUpdate(format!(
            "{} already exists",
            row
        ))),
        (Some(current), staged) if current == staged => Ok(()),
        _ => Err(DomainError::ConcurrentUpdate(format!(
            "{} changed since it was read",
            row
        ))),
    }
}

#[async_trait]
impl ModerationStore for InMemoryModerationStore {
    async fn commit(&self, writes: &ModerationWrites) -> Result<(), DomainError> {
        // Fixed lock order across every commit
        let mut reports = self.reports.reports.write().unwrap();
        let mut scores = self.scores.scores.write().unwrap();
        let mut users = self.users.users.write().unwrap();
        let mut requests = self.verifications.requests.write().unwrap();
        let mut badges = self.badges.badges.write().unwrap();

        let mut tables = Tables {
            reports: reports.clone(),
            scores: scores.clone(),
            users: users.clone(),
            requests: requests.clone(),
            badges: badges.clone(),
        };
        for write in writes.iter() {
            self.apply(&mut tables, write)?;
        }

        *reports = tables.reports;
        *scores = tables.scores;
        *users = tables.users;
        *requests = tables.requests;
        *badges = tables.badges;
        Ok(())
    }
}

// ============================================================================
// Mock Notifier
// ============================================================================

#[derive(Default)]
pub struct MockNotifier {
    pub events: Arc<RwLock<Vec<ModerationEvent>>>,
    should_fail: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn get_events(&self) -> Vec<ModerationEvent> {
        self.events.read().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, event: ModerationEvent) -> Result<(), NotificationError> {
        if self.should_fail {
            return Err(NotificationError::Delivery("mock delivery failure".into()));
        }
        self.events.write().unwrap().push(event);
        Ok(())
    }
}
