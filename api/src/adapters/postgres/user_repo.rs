//! PostgreSQL adapter for UserRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use super::{from_json, parse_column, to_json};
use crate::domain::entities::{ModeratedUser, UserId};
use crate::domain::ports::UserRepository;
use crate::entity::moderated_users;
use crate::error::DomainError;

/// PostgreSQL implementation of UserRepository
pub struct PostgresUserRepository {
    db: DatabaseConnection,
}

impl PostgresUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<ModeratedUser>, DomainError> {
        let result = moderated_users::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        result.map(ModeratedUser::try_from).transpose()
    }
}

/// Write a user under its row version: version 0 inserts, any other version
/// replaces the row only while it still holds that version
pub(crate) async fn write_user<C: ConnectionTrait>(
    db: &C,
    user: &ModeratedUser,
) -> Result<(), DomainError> {
    let mut model = moderated_users::ActiveModel {
        id: Set(user.id.0),
        account_status: Set(user.account_status.to_string()),
        safety_score: Set(user.safety_score),
        is_flagged: Set(user.is_flagged),
        restrictions: Set(to_json(&user.restrictions)?),
        suspended_until: Set(user.suspended_until.map(|dt| dt.fixed_offset())),
        ban_reason: Set(user.ban_reason.clone()),
        last_safety_check: Set(user.last_safety_check.map(|dt| dt.fixed_offset())),
        version: Set(user.version + 1),
    };

    if user.version == 0 {
        let inserted = moderated_users::Entity::insert(model)
            .on_conflict(
                OnConflict::column(moderated_users::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;
        if inserted == 0 {
            return Err(DomainError::ConcurrentUpdate(format!(
                "User {} already exists",
                user.id
            )));
        }
        return Ok(());
    }

    model.id = NotSet;
    let result = moderated_users::Entity::update_many()
        .set(model)
        .filter(moderated_users::Column::Id.eq(user.id.0))
        .filter(moderated_users::Column::Version.eq(user.version))
        .exec(db)
        .await
        .map_err(|e| DomainError::Database(e.to_string()))?;

    if result.rows_affected == 0 {
        return Err(DomainError::ConcurrentUpdate(format!(
            "User {} changed since it was read",
            user.id
        )));
    }
    Ok(())
}

impl TryFrom<moderated_users::Model> for ModeratedUser {
    type Error = DomainError;

    fn try_from(model: moderated_users::Model) -> Result<Self, Self::Error> {
        Ok(ModeratedUser {
            id: UserId(model.id),
            account_status: parse_column(&model.account_status, "moderated_users.account_status")?,
            safety_score: model.safety_score,
            is_flagged: model.is_flagged,
            restrictions: from_json(model.restrictions, "moderated_users.restrictions")?,
            suspended_until: model.suspended_until.map(|dt| dt.with_timezone(&Utc)),
            ban_reason: model.ban_reason,
            last_safety_check: model.last_safety_check.map(|dt| dt.with_timezone(&Utc)),
            version: model.version,
        })
    }
}
