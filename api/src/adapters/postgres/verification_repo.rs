//! PostgreSQL adapter for VerificationRequestRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};

use super::{from_json, parse_column, to_json, write_error};
use crate::domain::entities::{
    UserId, VerificationRequest, VerificationRequestId, VerificationStatus, VerificationType,
};
use crate::domain::ports::VerificationRequestRepository;
use crate::entity::verification_requests;
use crate::error::DomainError;

/// PostgreSQL implementation of VerificationRequestRepository
pub struct PostgresVerificationRequestRepository {
    db: DatabaseConnection,
}

impl PostgresVerificationRequestRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VerificationRequestRepository for PostgresVerificationRequestRepository {
    async fn find_by_id(
        &self,
        id: &VerificationRequestId,
    ) -> Result<Option<VerificationRequest>, DomainError> {
        let result = verification_requests::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        result.map(VerificationRequest::try_from).transpose()
    }

    async fn has_open_request(
        &self,
        user_id: &UserId,
        verification_type: VerificationType,
    ) -> Result<bool, DomainError> {
        let count = verification_requests::Entity::find()
            .filter(verification_requests::Column::UserId.eq(user_id.0))
            .filter(
                verification_requests::Column::VerificationType.eq(verification_type.to_string()),
            )
            .filter(verification_requests::Column::Status.is_in(open_statuses()))
            .count(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    async fn update_transition(
        &self,
        request: &VerificationRequest,
        expected: VerificationStatus,
    ) -> Result<(), DomainError> {
        transition_request(&self.db, request, expected).await
    }
}

fn open_statuses() -> [String; 2] {
    [
        VerificationStatus::Pending.to_string(),
        VerificationStatus::NeedsReview.to_string(),
    ]
}

/// Insert a new request; the partial unique index on open requests turns a
/// second open request of the same type into `Conflict`
pub(crate) async fn insert_request<C: ConnectionTrait>(
    db: &C,
    request: &VerificationRequest,
) -> Result<(), DomainError> {
    let model = verification_requests::ActiveModel {
        id: Set(request.id.0),
        user_id: Set(request.user_id.0),
        verification_type: Set(request.verification_type.to_string()),
        status: Set(request.status.to_string()),
        documents: Set(to_json(&request.documents)?),
        user_notes: Set(request.user_notes.clone()),
        admin_feedback: Set(request.admin_feedback.clone()),
        reviewed_by: Set(request.reviewed_by.map(|u| u.0)),
        reviewed_at: Set(request.reviewed_at.map(|dt| dt.fixed_offset())),
        submitted_at: Set(request.submitted_at.fixed_offset()),
    };

    verification_requests::Entity::insert(model)
        .exec_without_returning(db)
        .await
        .map_err(|e| {
            write_error(e, || {
                "You already have a pending verification request for this type".into()
            })
        })?;
    Ok(())
}

pub(crate) async fn transition_request<C: ConnectionTrait>(
    db: &C,
    request: &VerificationRequest,
    expected: VerificationStatus,
) -> Result<(), DomainError> {
    let changes = verification_requests::ActiveModel {
        status: Set(request.status.to_string()),
        admin_feedback: Set(request.admin_feedback.clone()),
        reviewed_by: Set(request.reviewed_by.map(|u| u.0)),
        reviewed_at: Set(request.reviewed_at.map(|dt| dt.fixed_offset())),
        ..Default::default()
    };

    let result = verification_requests::Entity::update_many()
        .set(changes)
        .filter(verification_requests::Column::Id.eq(request.id.0))
        .filter(verification_requests::Column::Status.eq(expected.to_string()))
        .exec(db)
        .await
        .map_err(|e| DomainError::Database(e.to_string()))?;

    if result.rows_affected > 0 {
        return Ok(());
    }
    let current = verification_requests::Entity::find_by_id(request.id.0)
        .one(db)
        .await
        .map_err(|e| DomainError::Database(e.to_string()))?;
    match current {
        Some(current) => Err(DomainError::Conflict(format!(
            "Verification request {} is no longer {} (now {})",
            request.id, expected, current.status
        ))),
        None => Err(DomainError::NotFound(format!(
            "Verification request {}",
            request.id
        ))),
    }
}

impl TryFrom<verification_requests::Model> for VerificationRequest {
    type Error = DomainError;

    fn try_from(model: verification_requests::Model) -> Result<Self, Self::Error> {
        Ok(VerificationRequest {
            id: VerificationRequestId(model.id),
            user_id: UserId(model.user_id),
            verification_type: parse_column(
                &model.verification_type,
                "verification_requests.verification_type",
            )?,
            status: parse_column(&model.status, "verification_requests.status")?,
            documents: from_json(model.documents, "verification_requests.documents")?,
            user_notes: model.user_notes,
            admin_feedback: model.admin_feedback,
            reviewed_by: model.reviewed_by.map(UserId),
            reviewed_at: model.reviewed_at.map(|dt| dt.with_timezone(&Utc)),
            submitted_at: model.submitted_at.with_timezone(&Utc),
        })
    }
}
