//! Safety service
//!
//! Owns every change to a user's safety score. Each event updates the
//! counters, recomputes the trust score and syncs the user's account
//! standing; score and user are committed together under their row versions
//! and restaged from fresh reads when another writer got there first.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{publish, should_retry};
use crate::domain::entities::{
    AccountStatus, ModeratedUser, RecommendedAction, Restrictions, SafetyScore, TrustLevel,
    UserId,
};
use crate::domain::ports::{
    ModerationEvent, ModerationStore, ModerationWrites, Notifier, SafetyScoreRepository,
    StagedWrite, UserRepository,
};
use crate::domain::scoring::TrustScore;
use crate::error::{AppError, DomainError};

/// Something that happened to a user and moves their trust score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SafetyEvent {
    /// A report was filed against the user
    Report {
        #[serde(default)]
        verified: bool,
    },
    /// A report already counted against the user was upheld
    #[serde(skip_deserializing)]
    ReportUpheld,
    CommunityFlag,
    PositiveFeedback,
    /// The user filed a report that was dismissed
    FalseReport,
}

/// Everything a moderator needs to judge a user at a glance
#[derive(Debug, Clone, Serialize)]
pub struct SafetyOverview {
    pub safety_score: SafetyScore,
    pub trust_level: TrustLevel,
    pub account_status: AccountStatus,
    pub score_status: AccountStatus,
    pub needs_review: bool,
    pub is_high_risk: bool,
    pub days_since_last_incident: Option<i64>,
    pub restrictions: Restrictions,
    pub can_message: bool,
    pub can_upload_photos: bool,
    pub recommended_actions: Vec<RecommendedAction>,
}

/// A user's safety score and moderation state, read and staged together so
/// the account status is always derived from the score it is written with
#[derive(Debug, Clone)]
pub(crate) struct Standing {
    pub score: SafetyScore,
    pub user: ModeratedUser,
    was_flagged: bool,
    previous_status: AccountStatus,
}

impl Standing {
    fn new(score: SafetyScore, user: ModeratedUser) -> Self {
        Self {
            was_flagged: score.needs_review(),
            previous_status: user.account_status,
            score,
            user,
        }
    }

    /// Apply an event to the counters and resync the account status
    pub fn record(&mut self, event: SafetyEvent, now: DateTime<Utc>) -> TrustScore {
        let result = match event {
            SafetyEvent::Report { verified } => self.score.record_report(verified, now),
            SafetyEvent::ReportUpheld => self.score.confirm_report(now),
            SafetyEvent::CommunityFlag => self.score.record_community_flag(now),
            SafetyEvent::PositiveFeedback => self.score.record_positive_feedback(now),
            SafetyEvent::FalseReport => self.score.record_false_report(now),
        };
        self.sync(now);
        result
    }

    pub fn recalculate(&mut self, now: DateTime<Utc>) -> TrustScore {
        let result = self.score.recalculate(now);
        self.sync(now);
        result
    }

    fn sync(&mut self, now: DateTime<Utc>) {
        self.user.apply_trust_standing(
            self.score.account_status(),
            self.score.trust_score,
            self.score.is_high_risk(),
            now,
        );
    }

    pub fn stage(&self, writes: &mut ModerationWrites) {
        writes.push(StagedWrite::Score(self.score.clone()));
        writes.push(StagedWrite::User(self.user.clone()));
    }

    /// Versions as stored by the commit that wrote this standing
    fn committed(&mut self) {
        self.score.version += 1;
        self.user.version += 1;
    }
}

/// Service for user safety scores and account standing
pub struct SafetyService<SR, UR, MS, N>
where
    SR: SafetyScoreRepository,
    UR: UserRepository,
    MS: ModerationStore,
    N: Notifier,
{
    scores: Arc<SR>,
    users: Arc<UR>,
    store: Arc<MS>,
    notifier: Arc<N>,
}

impl<SR, UR, MS, N> SafetyService<SR, UR, MS, N>
where
    SR: SafetyScoreRepository,
    UR: UserRepository,
    MS: ModerationStore,
    N: Notifier,
{
    pub fn new(scores: Arc<SR>, users: Arc<UR>, store: Arc<MS>, notifier: Arc<N>) -> Self {
        Self {
            scores,
            users,
            store,
            notifier,
        }
    }

    /// Load the user's safety record, creating a clean one on first access
    pub async fn get_or_create(&self, user_id: &UserId) -> Result<SafetyScore, AppError> {
        if let Some(score) = self.scores.find_by_user(user_id).await? {
            return Ok(score);
        }
        let mut score = SafetyScore::new(*user_id, Utc::now());
        let mut writes = ModerationWrites::new();
        writes.push(StagedWrite::Score(score.clone()));

        match self.store.commit(&writes).await {
            Ok(()) => {
                score.version += 1;
                tracing::debug!(user_id = %user_id, "Created safety score");
                Ok(score)
            }
            // Another request created it first
            Err(DomainError::ConcurrentUpdate(_)) => self
                .scores
                .find_by_user(user_id)
                .await?
                .ok_or_else(|| {
                    DomainError::Internal(format!("Safety score for {} vanished", user_id)).into()
                }),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn overview(&self, user_id: &UserId) -> Result<SafetyOverview, AppError> {
        let now = Utc::now();
        let score = self.get_or_create(user_id).await?;
        let user = self.load_user(user_id).await?;

        Ok(SafetyOverview {
            trust_level: score.trust_level(),
            account_status: user.account_status,
            score_status: score.account_status(),
            needs_review: score.needs_review(),
            is_high_risk: score.is_high_risk(),
            days_since_last_incident: score.days_since_last_incident(now),
            can_message: user.can_message(now),
            can_upload_photos: user.can_upload_photos(now),
            restrictions: user.restrictions,
            recommended_actions: score.recommended_actions(),
            safety_score: score,
        })
    }

    /// Apply an event and commit the recomputed score with the user's standing
    pub async fn record_event(
        &self,
        user_id: &UserId,
        event: SafetyEvent,
    ) -> Result<SafetyScore, AppError> {
        let now = Utc::now();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut standing = self.load_standing(user_id).await?;
            let result = standing.record(event, now);

            let mut writes = ModerationWrites::new();
            standing.stage(&mut writes);
            match self.store.commit(&writes).await {
                Ok(()) => {
                    tracing::info!(
                        user_id = %user_id,
                        event = ?event,
                        trust_score = result.trust_score,
                        risk = %result.risk_category,
                        "Recorded safety event"
                    );
                    self.settle(&mut standing, now).await;
                    return Ok(standing.score);
                }
                Err(e) if should_retry(&e, attempt) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Recompute the trust score from the stored counters
    pub async fn recalculate(&self, user_id: &UserId) -> Result<SafetyScore, AppError> {
        let now = Utc::now();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut standing = self.load_standing(user_id).await?;
            let before = standing.score.trust_score;
            standing.recalculate(now);

            let mut writes = ModerationWrites::new();
            standing.stage(&mut writes);
            match self.store.commit(&writes).await {
                Ok(()) => {
                    if before != standing.score.trust_score {
                        tracing::info!(
                            user_id = %user_id,
                            from = before,
                            to = standing.score.trust_score,
                            "Trust score changed on recalculation"
                        );
                    }
                    self.settle(&mut standing, now).await;
                    return Ok(standing.score);
                }
                Err(e) if should_retry(&e, attempt) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub async fn needs_review(&self, limit: u64) -> Result<Vec<SafetyScore>, AppError> {
        Ok(self.scores.find_needs_review(limit).await?)
    }

    pub(crate) async fn load_user(&self, user_id: &UserId) -> Result<ModeratedUser, AppError> {
        Ok(self
            .users
            .find_by_id(user_id)
            .await?
            .unwrap_or_else(|| ModeratedUser::new(*user_id)))
    }

    /// Fresh score and user rows; missing ones start at version 0 and are
    /// inserted by the commit that stages them
    pub(crate) async fn load_standing(&self, user_id: &UserId) -> Result<Standing, AppError> {
        let score = self
            .scores
            .find_by_user(user_id)
            .await?
            .unwrap_or_else(|| SafetyScore::new(*user_id, Utc::now()));
        let user = self.load_user(user_id).await?;
        Ok(Standing::new(score, user))
    }

    pub(crate) async fn commit(&self, writes: &ModerationWrites) -> Result<(), DomainError> {
        self.store.commit(writes).await
    }

    /// Bookkeeping after a standing was committed: bump versions, log a
    /// status change and flag the user the first time they need review
    pub(crate) async fn settle(&self, standing: &mut Standing, now: DateTime<Utc>) {
        standing.committed();
        let user = &standing.user;
        if user.account_status != standing.previous_status {
            tracing::info!(
                user_id = %user.id,
                from = %standing.previous_status,
                to = %user.account_status,
                "Account status changed"
            );
        }
        if !standing.was_flagged && standing.score.needs_review() {
            self.flag(&standing.score, now).await;
        }
    }

    async fn flag(&self, score: &SafetyScore, now: DateTime<Utc>) {
        tracing::warn!(
            user_id = %score.user_id,
            trust_score = score.trust_score,
            "User now needs manual review"
        );
        publish(
            self.notifier.as_ref(),
            ModerationEvent::UserFlagged {
                user_id: score.user_id,
                trust_score: score.trust_score,
                risk_category: score.risk_category,
                timestamp: now,
            },
        )
        .await;
    }
}
