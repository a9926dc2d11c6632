//! Safety score handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use super::LimitQuery;
use crate::app::{SafetyEvent, SafetyOverview};
use crate::domain::entities::{SafetyScore, UserId};
use crate::error::AppError;
use crate::AppState;

/// GET /users/:id/safety
pub async fn get_overview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SafetyOverview>, AppError> {
    Ok(Json(state.safety_service.overview(&UserId(id)).await?))
}

/// POST /users/:id/safety/events
///
/// Record a report, community flag, positive feedback or false report.
pub async fn record_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(event): Json<SafetyEvent>,
) -> Result<Json<SafetyScore>, AppError> {
    let score = state
        .safety_service
        .record_event(&UserId(id), event)
        .await?;
    Ok(Json(score))
}

/// POST /users/:id/safety/recalculate
pub async fn recalculate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SafetyScore>, AppError> {
    Ok(Json(state.safety_service.recalculate(&UserId(id)).await?))
}

/// GET /safety/needs-review
pub async fn needs_review(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<SafetyScore>>, AppError> {
    let scores = state.safety_service.needs_review(query.clamped()).await?;
    Ok(Json(scores))
}
