//! PostgreSQL adapter for VerifiedBadgeRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use super::parse_column;
use crate::domain::entities::{
    BadgeId, BadgeStatus, NewVerifiedBadge, UserId, VerifiedBadge,
};
use crate::domain::ports::VerifiedBadgeRepository;
use crate::entity::verified_badges;
use crate::error::DomainError;

/// PostgreSQL implementation of VerifiedBadgeRepository
pub struct PostgresVerifiedBadgeRepository {
    db: DatabaseConnection,
}

impl PostgresVerifiedBadgeRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VerifiedBadgeRepository for PostgresVerifiedBadgeRepository {
    async fn find_by_id(&self, id: &BadgeId) -> Result<Option<VerifiedBadge>, DomainError> {
        let result = verified_badges::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        result.map(VerifiedBadge::try_from).transpose()
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<VerifiedBadge>, DomainError> {
        let results = verified_badges::Entity::find()
            .filter(verified_badges::Column::UserId.eq(user_id.0))
            .order_by_asc(verified_badges::Column::BadgeType)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        results.into_iter().map(VerifiedBadge::try_from).collect()
    }

    async fn create(&self, new_badge: &NewVerifiedBadge) -> Result<VerifiedBadge, DomainError> {
        let badge = VerifiedBadge::requested(new_badge.clone());
        insert_badge(&self.db, &badge).await?;
        Ok(badge)
    }

    async fn update_transition(
        &self,
        badge: &VerifiedBadge,
        expected: BadgeStatus,
    ) -> Result<(), DomainError> {
        transition_badge(&self.db, badge, expected).await
    }
}

pub(crate) async fn insert_badge<C: ConnectionTrait>(
    db: &C,
    badge: &VerifiedBadge,
) -> Result<(), DomainError> {
    let model = verified_badges::ActiveModel {
        id: Set(badge.id.0),
        user_id: Set(badge.user_id.0),
        badge_type: Set(badge.badge_type.to_string()),
        status: Set(badge.status.to_string()),
        admin_notes: Set(badge.admin_notes.clone()),
        verified_at: Set(badge.verified_at.map(|dt| dt.fixed_offset())),
        expires_at: Set(badge.expires_at.map(|dt| dt.fixed_offset())),
        verified_by: Set(badge.verified_by.map(|u| u.0)),
    };

    verified_badges::Entity::insert(model)
        .exec_without_returning(db)
        .await
        .map_err(|e| DomainError::Database(e.to_string()))?;
    Ok(())
}

pub(crate) async fn transition_badge<C: ConnectionTrait>(
    db: &C,
    badge: &VerifiedBadge,
    expected: BadgeStatus,
) -> Result<(), DomainError> {
    let changes = verified_badges::ActiveModel {
        status: Set(badge.status.to_string()),
        admin_notes: Set(badge.admin_notes.clone()),
        verified_at: Set(badge.verified_at.map(|dt| dt.fixed_offset())),
        expires_at: Set(badge.expires_at.map(|dt| dt.fixed_offset())),
        verified_by: Set(badge.verified_by.map(|u| u.0)),
        ..Default::default()
    };

    let result = verified_badges::Entity::update_many()
        .set(changes)
        .filter(verified_badges::Column::Id.eq(badge.id.0))
        .filter(verified_badges::Column::Status.eq(expected.to_string()))
        .exec(db)
        .await
        .map_err(|e| DomainError::Database(e.to_string()))?;

    if result.rows_affected > 0 {
        return Ok(());
    }
    let current = verified_badges::Entity::find_by_id(badge.id.0)
        .one(db)
        .await
        .map_err(|e| DomainError::Database(e.to_string()))?;
    match current {
        Some(current) => Err(DomainError::Conflict(format!(
            "Badge {} is no longer {} (now {})",
            badge.id, expected, current.status
        ))),
        None => Err(DomainError::NotFound(format!("Badge {}", badge.id))),
    }
}

impl TryFrom<verified_badges::Model> for VerifiedBadge {
    type Error = DomainError;

    fn try_from(model: verified_badges::Model) -> Result<Self, Self::Error> {
        Ok(VerifiedBadge {
            id: BadgeId(model.id),
            user_id: UserId(model.user_id),
            badge_type: parse_column(&model.badge_type, "verified_badges.badge_type")?,
            status: parse_column(&model.status, "verified_badges.status")?,
            admin_notes: model.admin_notes,
            verified_at: model.verified_at.map(|dt| dt.with_timezone(&Utc)),
            expires_at: model.expires_at.map(|dt| dt.with_timezone(&Utc)),
            verified_by: model.verified_by.map(UserId),
        })
    }
}
