//! PostgreSQL adapter for PanicActivationRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::{parse_column, write_error};
use crate::domain::entities::{
    NewPanicActivation, PanicActivation, PanicActivationId, PanicStatus, UserId,
};
use crate::domain::ports::PanicActivationRepository;
use crate::entity::panic_activations;
use crate::error::DomainError;

/// PostgreSQL implementation of PanicActivationRepository
pub struct PostgresPanicActivationRepository {
    db: DatabaseConnection,
}

impl PostgresPanicActivationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PanicActivationRepository for PostgresPanicActivationRepository {
    async fn find_by_id(
        &self,
        id: &PanicActivationId,
    ) -> Result<Option<PanicActivation>, DomainError> {
        let result = panic_activations::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        result.map(PanicActivation::try_from).transpose()
    }

    async fn create(&self, panic: &NewPanicActivation) -> Result<PanicActivation, DomainError> {
        let model = panic_activations::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(panic.user_id.0),
            trigger_type: Set(panic.trigger_type.to_string()),
            status: Set(PanicStatus::Active.to_string()),
            user_message: Set(panic.user_message.clone()),
            location_address: Set(panic.location_address.clone()),
            triggered_at: Set(Utc::now().fixed_offset()),
            resolved_at: Set(None),
            resolved_by: Set(None),
            resolution_notes: Set(None),
            authorities_contacted: Set(false),
        };

        // The partial unique index on open panics refuses a second one per user
        let user_id = panic.user_id;
        let result = model.insert(&self.db).await.map_err(|e| {
            write_error(e, || {
                format!("Panic button is already active for user {}", user_id)
            })
        })?;

        PanicActivation::try_from(result)
    }

    async fn find_open_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<PanicActivation>, DomainError> {
        let result = panic_activations::Entity::find()
            .filter(panic_activations::Column::UserId.eq(user_id.0))
            .filter(panic_activations::Column::Status.is_in(open_statuses()))
            .order_by_desc(panic_activations::Column::TriggeredAt)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        result.map(PanicActivation::try_from).transpose()
    }

    async fn update_transition(
        &self,
        panic: &PanicActivation,
        expected: PanicStatus,
    ) -> Result<(), DomainError> {
        let changes = panic_activations::ActiveModel {
            status: Set(panic.status.to_string()),
            resolved_at: Set(panic.resolved_at.map(|dt| dt.fixed_offset())),
            resolved_by: Set(panic.resolved_by.map(|u| u.0)),
            resolution_notes: Set(panic.resolution_notes.clone()),
            authorities_contacted: Set(panic.authorities_contacted),
            ..Default::default()
        };

        let result = panic_activations::Entity::update_many()
            .set(changes)
            .filter(panic_activations::Column::Id.eq(panic.id.0))
            .filter(panic_activations::Column::Status.eq(expected.to_string()))
            .exec(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        if result.rows_affected > 0 {
            return Ok(());
        }
        match self.find_by_id(&panic.id).await? {
            Some(current) => Err(DomainError::Conflict(format!(
                "Panic {} is no longer {} (now {})",
                panic.id, expected, current.status
            ))),
            None => Err(DomainError::NotFound(format!("Panic {}", panic.id))),
        }
    }

    async fn find_open(&self) -> Result<Vec<PanicActivation>, DomainError> {
        let results = panic_activations::Entity::find()
            .filter(panic_activations::Column::Status.is_in(open_statuses()))
            .order_by_asc(panic_activations::Column::TriggeredAt)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        results.into_iter().map(PanicActivation::try_from).collect()
    }
}

fn open_statuses() -> [String; 2] {
    [
        PanicStatus::Active.to_string(),
        PanicStatus::Escalated.to_string(),
    ]
}

impl TryFrom<panic_activations::Model> for PanicActivation {
    type Error = DomainError;

    fn try_from(model: panic_activations::Model) -> Result<Self, Self::Error> {
        Ok(PanicActivation {
            id: PanicActivationId(model.id),
            user_id: UserId(model.user_id),
            trigger_type: parse_column(&model.trigger_type, "panic_activations.trigger_type")?,
            status: parse_column(&model.status, "panic_activations.status")?,
            user_message: model.user_message,
            location_address: model.location_address,
            triggered_at: model.triggered_at.with_timezone(&Utc),
            resolved_at: model.resolved_at.map(|dt| dt.with_timezone(&Utc)),
            resolved_by: model.resolved_by.map(UserId),
            resolution_notes: model.resolution_notes,
            authorities_contacted: model.authorities_contacted,
        })
    }
}
