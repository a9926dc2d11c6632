//! Badge service
//!
//! Verified profile badges: applications, admin verification and renewal.
//! Expiry is evaluated on read, so a verified badge past its date is shown
//! as expired without a background job rewriting it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::publish;
use crate::domain::entities::{
    BadgeId, BadgeStatus, BadgeType, NewVerifiedBadge, UserId, VerifiedBadge,
};
use crate::domain::ports::{ModerationEvent, Notifier, VerifiedBadgeRepository};
use crate::error::{AppError, DomainError};

/// A badge with its expiry evaluated at read time
#[derive(Debug, Clone, Serialize)]
pub struct BadgeView {
    #[serde(flatten)]
    pub badge: VerifiedBadge,
    pub effective_status: BadgeStatus,
    pub is_active: bool,
    pub expires_soon: bool,
    pub days_until_expiration: Option<i64>,
    pub score_value: i32,
}

impl BadgeView {
    fn at(badge: VerifiedBadge, now: DateTime<Utc>) -> Self {
        Self {
            effective_status: badge.effective_status(now),
            is_active: badge.is_active(now),
            expires_soon: badge.expires_soon(now),
            days_until_expiration: badge.days_until_expiration(now),
            score_value: badge.score_value(now),
            badge,
        }
    }
}

/// All of a user's badges plus their combined profile score
#[derive(Debug, Clone, Serialize)]
pub struct UserBadges {
    pub user_id: UserId,
    pub badges: Vec<BadgeView>,
    pub total_score: i32,
}

pub struct BadgeService<BR, N>
where
    BR: VerifiedBadgeRepository,
    N: Notifier,
{
    badges: Arc<BR>,
    notifier: Arc<N>,
}

impl<BR, N> BadgeService<BR, N>
where
    BR: VerifiedBadgeRepository,
    N: Notifier,
{
    pub fn new(badges: Arc<BR>, notifier: Arc<N>) -> Self {
        Self { badges, notifier }
    }

    /// Open an application; one open or active badge per type and user
    pub async fn request(
        &self,
        user_id: UserId,
        badge_type: BadgeType,
    ) -> Result<BadgeView, AppError> {
        let now = Utc::now();
        let existing = self.badges.find_by_user(&user_id).await?;
        if let Some(current) = existing.iter().find(|b| {
            b.badge_type == badge_type
                && matches!(b.effective_status(now), BadgeStatus::Pending | BadgeStatus::Verified)
        }) {
            return Err(DomainError::Conflict(format!(
                "User already has a {} {} badge",
                current.status, badge_type
            ))
            .into());
        }

        let badge = self
            .badges
            .create(&NewVerifiedBadge {
                user_id,
                badge_type,
            })
            .await?;
        tracing::info!(
            badge_id = %badge.id,
            user_id = %user_id,
            badge_type = %badge_type,
            "Badge requested"
        );
        Ok(BadgeView::at(badge, now))
    }

    pub async fn list_for_user(&self, user_id: &UserId) -> Result<UserBadges, AppError> {
        let now = Utc::now();
        let badges: Vec<BadgeView> = self
            .badges
            .find_by_user(user_id)
            .await?
            .into_iter()
            .map(|b| BadgeView::at(b, now))
            .collect();
        Ok(UserBadges {
            user_id: *user_id,
            total_score: badges.iter().map(|b| b.score_value).sum(),
            badges,
        })
    }

    /// Grant a badge; without an explicit expiry the badge type's period applies
    pub async fn verify(
        &self,
        id: &BadgeId,
        by: UserId,
        expires_at: Option<DateTime<Utc>>,
        notes: Option<String>,
    ) -> Result<BadgeView, AppError> {
        let now = Utc::now();
        let mut badge = self.load(id).await?;
        let expected = badge.status;
        let expires_at = expires_at.or_else(|| badge.badge_type.default_expiry(now));
        let notes = notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        badge.mark_verified(by, expires_at, notes, now)?;
        self.persist(badge, expected, now).await
    }

    pub async fn reject(
        &self,
        id: &BadgeId,
        by: UserId,
        reason: &str,
    ) -> Result<BadgeView, AppError> {
        let now = Utc::now();
        let mut badge = self.load(id).await?;
        let expected = badge.status;
        badge.mark_rejected(by, reason)?;
        self.persist(badge, expected, now).await
    }

    pub async fn renew(
        &self,
        id: &BadgeId,
        by: UserId,
        new_expiry: Option<DateTime<Utc>>,
    ) -> Result<BadgeView, AppError> {
        let now = Utc::now();
        let mut badge = self.load(id).await?;
        let expected = badge.status;
        badge.renew(new_expiry, now)?;
        tracing::debug!(badge_id = %badge.id, renewed_by = %by, "Renewing badge");
        self.persist(badge, expected, now).await
    }

    async fn load(&self, id: &BadgeId) -> Result<VerifiedBadge, AppError> {
        self.badges
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Badge {}", id)))
    }

    async fn persist(
        &self,
        badge: VerifiedBadge,
        expected: BadgeStatus,
        now: DateTime<Utc>,
    ) -> Result<BadgeView, AppError> {
        self.badges.update_transition(&badge, expected).await?;

        tracing::info!(
            badge_id = %badge.id,
            badge_type = %badge.badge_type,
            from = %expected,
            to = %badge.status,
            expires_at = ?badge.expires_at,
            "Badge updated"
        );
        publish(
            self.notifier.as_ref(),
            ModerationEvent::BadgeUpdated {
                badge_id: badge.id,
                user_id: badge.user_id,
                status: badge.status,
                expires_at: badge.expires_at,
            },
        )
        .await;

        Ok(BadgeView::at(badge, now))
    }
}
