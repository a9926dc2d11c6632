//! Verified badge handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::ReasonRequest;
use crate::app::{BadgeView, UserBadges};
use crate::auth::Reviewer;
use crate::domain::entities::{BadgeId, BadgeType, UserId};
use crate::error::AppError;
use crate::AppState;

/// Request to open a badge application
#[derive(Debug, Deserialize)]
pub struct RequestBadgeRequest {
    pub user_id: UserId,
    pub badge_type: BadgeType,
}

/// Request to grant a badge
#[derive(Debug, Default, Deserialize)]
pub struct VerifyBadgeRequest {
    /// Defaults to the badge type's renewal period
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request to renew a badge
#[derive(Debug, Default, Deserialize)]
pub struct RenewBadgeRequest {
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// POST /badges
pub async fn request_badge(
    State(state): State<AppState>,
    Json(request): Json<RequestBadgeRequest>,
) -> Result<(StatusCode, Json<BadgeView>), AppError> {
    let view = state
        .badge_service
        .request(request.user_id, request.badge_type)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /users/:id/badges
pub async fn list_for_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserBadges>, AppError> {
    Ok(Json(state.badge_service.list_for_user(&UserId(id)).await?))
}

/// POST /badges/:id/verify
pub async fn verify(
    State(state): State<AppState>,
    Extension(Reviewer(admin_id)): Extension<Reviewer>,
    Path(id): Path<Uuid>,
    Json(request): Json<VerifyBadgeRequest>,
) -> Result<Json<BadgeView>, AppError> {
    let view = state
        .badge_service
        .verify(&BadgeId(id), admin_id, request.expires_at, request.notes)
        .await?;
    Ok(Json(view))
}

/// POST /badges/:id/reject
pub async fn reject(
    State(state): State<AppState>,
    Extension(Reviewer(admin_id)): Extension<Reviewer>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReasonRequest>,
) -> Result<Json<BadgeView>, AppError> {
    let view = state
        .badge_service
        .reject(&BadgeId(id), admin_id, &request.reason)
        .await?;
    Ok(Json(view))
}

/// POST /badges/:id/renew
pub async fn renew(
    State(state): State<AppState>,
    Extension(Reviewer(admin_id)): Extension<Reviewer>,
    Path(id): Path<Uuid>,
    Json(request): Json<RenewBadgeRequest>,
) -> Result<Json<BadgeView>, AppError> {
    let view = state
        .badge_service
        .renew(&BadgeId(id), admin_id, request.expires_at)
        .await?;
    Ok(Json(view))
}
