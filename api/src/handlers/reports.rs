//! Report handlers
//!
//! Intake, review queue, review actions and the moderation dashboard.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use super::LimitQuery;
use crate::app::{ReportDashboard, ReportSubmission, ReviewDecision};
use crate::auth::Reviewer;
use crate::domain::entities::{Report, ReportId};
use crate::error::AppError;
use crate::AppState;

/// POST /reports
///
/// File a report on behalf of a member.
pub async fn submit_report(
    State(state): State<AppState>,
    Json(request): Json<ReportSubmission>,
) -> Result<(StatusCode, Json<Report>), AppError> {
    let report = state.reporting_service.submit_report(request).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// GET /reports/queue
///
/// Open reports, highest priority first.
pub async fn review_queue(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<Report>>, AppError> {
    let reports = state
        .reporting_service
        .review_queue(query.clamped())
        .await?;
    Ok(Json(reports))
}

/// GET /reports/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
) -> Result<Json<ReportDashboard>, AppError> {
    Ok(Json(state.reporting_service.dashboard().await?))
}

/// GET /reports/:id
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Report>, AppError> {
    let report = state.reporting_service.get_report(&ReportId(id)).await?;
    Ok(Json(report))
}

/// POST /reports/:id/review
///
/// Body is tagged by `action`: `under_review`, `resolve`, `dismiss` or `escalate`.
pub async fn review_report(
    State(state): State<AppState>,
    Extension(Reviewer(admin_id)): Extension<Reviewer>,
    Path(id): Path<Uuid>,
    Json(decision): Json<ReviewDecision>,
) -> Result<Json<Report>, AppError> {
    let report = state
        .reporting_service
        .review_report(&ReportId(id), admin_id, decision)
        .await?;
    Ok(Json(report))
}

/// POST /reports/:id/recompute
pub async fn recompute_priority(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Report>, AppError> {
    let report = state
        .reporting_service
        .recompute_priority(&ReportId(id))
        .await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ModerationAction;

    #[test]
    fn review_decision_parses_resolve_with_actions() {
        let decision: ReviewDecision = serde_json::from_str(
            r#"{"action":"resolve","actions":[{"type":"restrict_messaging","duration":72}],"notes":"confirmed"}"#,
        )
        .unwrap();
        assert_eq!(
            decision,
            ReviewDecision::Resolve {
                actions: vec![ModerationAction::RestrictMessaging { duration: 72 }],
                notes: Some("confirmed".into()),
            }
        );
    }

    #[test]
    fn review_decision_requires_reason_for_dismiss() {
        assert!(serde_json::from_str::<ReviewDecision>(r#"{"action":"dismiss"}"#).is_err());
        let decision: ReviewDecision =
            serde_json::from_str(r#"{"action":"under_review"}"#).unwrap();
        assert_eq!(decision, ReviewDecision::UnderReview);
    }

    #[test]
    fn submission_defaults_optional_fields() {
        let submission: ReportSubmission = serde_json::from_str(
            r#"{
                "reporter_id": "00000000-0000-0000-0000-000000000001",
                "reported_user_id": "00000000-0000-0000-0000-000000000002",
                "category": "fake_profile",
                "description": "Photos belong to someone else"
            }"#,
        )
        .unwrap();
        assert!(submission.severity.is_none());
        assert!(submission.evidence.is_empty());
        assert!(!submission.is_anonymous);
    }
}
