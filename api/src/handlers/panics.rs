//! Panic activation handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::{PanicTrigger, PanicView};
use crate::auth::Reviewer;
use crate::domain::entities::PanicActivationId;
use crate::error::AppError;
use crate::AppState;

/// Request to close a panic
#[derive(Debug, Deserialize)]
pub struct ResolvePanicRequest {
    pub notes: String,
    #[serde(default)]
    pub false_alarm: bool,
}

/// Request to hand a panic to authorities
#[derive(Debug, Deserialize)]
pub struct EscalatePanicRequest {
    pub notes: String,
}

/// POST /panics
pub async fn trigger(
    State(state): State<AppState>,
    Json(request): Json<PanicTrigger>,
) -> Result<(StatusCode, Json<PanicView>), AppError> {
    let view = state.panic_service.trigger(request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /panics/active
///
/// Open panics, overdue first.
pub async fn open_queue(State(state): State<AppState>) -> Result<Json<Vec<PanicView>>, AppError> {
    Ok(Json(state.panic_service.open_queue().await?))
}

/// GET /panics/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PanicView>, AppError> {
    Ok(Json(state.panic_service.get(&PanicActivationId(id)).await?))
}

/// POST /panics/:id/resolve
pub async fn resolve(
    State(state): State<AppState>,
    Extension(Reviewer(admin_id)): Extension<Reviewer>,
    Path(id): Path<Uuid>,
    Json(request): Json<ResolvePanicRequest>,
) -> Result<Json<PanicView>, AppError> {
    let view = state
        .panic_service
        .resolve(
            &PanicActivationId(id),
            admin_id,
            &request.notes,
            request.false_alarm,
        )
        .await?;
    Ok(Json(view))
}

/// POST /panics/:id/escalate
pub async fn escalate(
    State(state): State<AppState>,
    Extension(Reviewer(admin_id)): Extension<Reviewer>,
    Path(id): Path<Uuid>,
    Json(request): Json<EscalatePanicRequest>,
) -> Result<Json<PanicView>, AppError> {
    let view = state
        .panic_service
        .escalate(&PanicActivationId(id), admin_id, &request.notes)
        .await?;
    Ok(Json(view))
}
