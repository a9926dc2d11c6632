//! Verification request handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::ReasonRequest;
use crate::app::{VerificationSubmission, VerificationView};
use crate::auth::Reviewer;
use crate::domain::entities::VerificationRequestId;
use crate::error::AppError;
use crate::AppState;

/// Request to approve a verification
#[derive(Debug, Default, Deserialize)]
pub struct ApproveRequest {
    #[serde(default)]
    pub feedback: Option<String>,
}

/// POST /verifications
pub async fn submit(
    State(state): State<AppState>,
    Json(request): Json<VerificationSubmission>,
) -> Result<(StatusCode, Json<VerificationView>), AppError> {
    let view = state.verification_service.submit(request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /verifications/:id
///
/// The request together with the documents it is still missing.
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<VerificationView>, AppError> {
    let view = state
        .verification_service
        .get(&VerificationRequestId(id))
        .await?;
    Ok(Json(view))
}

/// POST /verifications/:id/approve
pub async fn approve(
    State(state): State<AppState>,
    Extension(Reviewer(admin_id)): Extension<Reviewer>,
    Path(id): Path<Uuid>,
    Json(request): Json<ApproveRequest>,
) -> Result<Json<VerificationView>, AppError> {
    let view = state
        .verification_service
        .approve(&VerificationRequestId(id), admin_id, request.feedback)
        .await?;
    Ok(Json(view))
}

/// POST /verifications/:id/reject
pub async fn reject(
    State(state): State<AppState>,
    Extension(Reviewer(admin_id)): Extension<Reviewer>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReasonRequest>,
) -> Result<Json<VerificationView>, AppError> {
    let view = state
        .verification_service
        .reject(&VerificationRequestId(id), admin_id, &request.reason)
        .await?;
    Ok(Json(view))
}

/// POST /verifications/:id/needs-review
pub async fn needs_review(
    State(state): State<AppState>,
    Extension(Reviewer(admin_id)): Extension<Reviewer>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReasonRequest>,
) -> Result<Json<VerificationView>, AppError> {
    let view = state
        .verification_service
        .needs_review(&VerificationRequestId(id), admin_id, &request.reason)
        .await?;
    Ok(Json(view))
}
