//! PostgreSQL adapter for ReportRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use super::{from_json, parse_column, to_json};
use crate::domain::entities::{Report, ReportId, ReportSeverity, ReportStatus, UserId};
use crate::domain::ports::ReportRepository;
use crate::entity::reports;
use crate::error::DomainError;

/// PostgreSQL implementation of ReportRepository
pub struct PostgresReportRepository {
    db: DatabaseConnection,
}

impl PostgresReportRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

pub(crate) async fn insert_report<C: ConnectionTrait>(
    db: &C,
    report: &Report,
) -> Result<(), DomainError> {
    let model = reports::ActiveModel {
        id: Set(report.id.0),
        reporter_id: Set(report.reporter_id.0),
        reported_user_id: Set(report.reported_user_id.0),
        category: Set(report.category.to_string()),
        subcategory: Set(report.subcategory.clone()),
        description: Set(report.description.clone()),
        severity: Set(report.severity.to_string()),
        status: Set(report.status.to_string()),
        evidence: Set(to_json(&report.evidence)?),
        priority_score: Set(report.priority_score),
        reviewed_by: Set(report.reviewed_by.map(|u| u.0)),
        reviewed_at: Set(report.reviewed_at.map(|dt| dt.fixed_offset())),
        resolved_at: Set(report.resolved_at.map(|dt| dt.fixed_offset())),
        actions_taken: Set(to_json(&report.actions_taken)?),
        admin_notes: Set(report.admin_notes.clone()),
        is_anonymous: Set(report.is_anonymous),
        created_at: Set(report.created_at.fixed_offset()),
    };

    reports::Entity::insert(model)
        .exec_without_returning(db)
        .await
        .map_err(|e| DomainError::Database(e.to_string()))?;
    Ok(())
}

/// Store a report's review fields while its status still equals `expected`
pub(crate) async fn transition_report<C: ConnectionTrait>(
    db: &C,
    report: &Report,
    expected: ReportStatus,
) -> Result<(), DomainError> {
    let changes = reports::ActiveModel {
        severity: Set(report.severity.to_string()),
        status: Set(report.status.to_string()),
        priority_score: Set(report.priority_score),
        reviewed_by: Set(report.reviewed_by.map(|u| u.0)),
        reviewed_at: Set(report.reviewed_at.map(|dt| dt.fixed_offset())),
        resolved_at: Set(report.resolved_at.map(|dt| dt.fixed_offset())),
        actions_taken: Set(to_json(&report.actions_taken)?),
        admin_notes: Set(report.admin_notes.clone()),
        ..Default::default()
    };

    let result = reports::Entity::update_many()
        .set(changes)
        .filter(reports::Column::Id.eq(report.id.0))
        .filter(reports::Column::Status.eq(expected.to_string()))
        .exec(db)
        .await
        .map_err(|e| DomainError::Database(e.to_string()))?;

    if result.rows_affected == 0 {
        return Err(lost_race(db, &report.id, expected).await);
    }
    Ok(())
}

/// Explains a conditional update that matched no rows
async fn lost_race<C: ConnectionTrait>(
    db: &C,
    id: &ReportId,
    expected: ReportStatus,
) -> DomainError {
    let current = reports::Entity::find_by_id(id.0)
        .select_only()
        .column(reports::Column::Status)
        .into_tuple::<String>()
        .one(db)
        .await;
    match current {
        Ok(Some(status)) => DomainError::Conflict(format!(
            "Report {} is no longer {} (now {})",
            id, expected, status
        )),
        Ok(None) => DomainError::NotFound(format!("Report {}", id)),
        Err(e) => DomainError::Database(e.to_string()),
    }
}

#[async_trait]
impl ReportRepository for PostgresReportRepository {
    async fn find_by_id(&self, id: &ReportId) -> Result<Option<Report>, DomainError> {
        let result = reports::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        result.map(Report::try_from).transpose()
    }

    async fn update_priority(
        &self,
        id: &ReportId,
        priority_score: i32,
    ) -> Result<(), DomainError> {
        let result = reports::Entity::update_many()
            .col_expr(reports::Column::PriorityScore, Expr::value(priority_score))
            .filter(reports::Column::Id.eq(id.0))
            .exec(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            Err(DomainError::NotFound(format!("Report {}", id)))
        } else {
            Ok(())
        }
    }

    async fn count_against_user(
        &self,
        user_id: &UserId,
        exclude: Option<&ReportId>,
    ) -> Result<u32, DomainError> {
        let mut query =
            reports::Entity::find().filter(reports::Column::ReportedUserId.eq(user_id.0));
        if let Some(id) = exclude {
            query = query.filter(reports::Column::Id.ne(id.0));
        }

        let count = query
            .count(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn exists_from_reporter_since(
        &self,
        reporter_id: &UserId,
        reported_user_id: &UserId,
        since: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let count = reports::Entity::find()
            .filter(reports::Column::ReporterId.eq(reporter_id.0))
            .filter(reports::Column::ReportedUserId.eq(reported_user_id.0))
            .filter(reports::Column::CreatedAt.gte(since.fixed_offset()))
            .count(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    async fn find_open_by_priority(&self, limit: u64) -> Result<Vec<Report>, DomainError> {
        let open: Vec<String> = ReportStatus::ALL
            .iter()
            .filter(|s| !s.is_terminal())
            .map(|s| s.to_string())
            .collect();

        let results = reports::Entity::find()
            .filter(reports::Column::Status.is_in(open))
            .order_by_desc(reports::Column::PriorityScore)
            .order_by_asc(reports::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        results.into_iter().map(Report::try_from).collect()
    }

    async fn count_by_status(&self) -> Result<Vec<(ReportStatus, u64)>, DomainError> {
        let rows: Vec<(String, i64)> = reports::Entity::find()
            .select_only()
            .column(reports::Column::Status)
            .column_as(Expr::col(reports::Column::Id).count(), "count")
            .group_by(reports::Column::Status)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|(status, count)| Ok((parse_column(&status, "reports.status")?, count as u64)))
            .collect()
    }

    async fn count_by_severity(&self) -> Result<Vec<(ReportSeverity, u64)>, DomainError> {
        let rows: Vec<(String, i64)> = reports::Entity::find()
            .select_only()
            .column(reports::Column::Severity)
            .column_as(Expr::col(reports::Column::Id).count(), "count")
            .group_by(reports::Column::Severity)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|(severity, count)| {
                Ok((parse_column(&severity, "reports.severity")?, count as u64))
            })
            .collect()
    }

    async fn count_pending_with_priority_at_least(
        &self,
        threshold: i32,
    ) -> Result<u64, DomainError> {
        reports::Entity::find()
            .filter(reports::Column::Status.eq(ReportStatus::Pending.to_string()))
            .filter(reports::Column::PriorityScore.gte(threshold))
            .count(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))
    }
}

/// Convert SeaORM model to domain entity
impl TryFrom<reports::Model> for Report {
    type Error = DomainError;

    fn try_from(model: reports::Model) -> Result<Self, Self::Error> {
        Ok(Report {
            id: ReportId(model.id),
            reporter_id: UserId(model.reporter_id),
            reported_user_id: UserId(model.reported_user_id),
            category: parse_column(&model.category, "reports.category")?,
            subcategory: model.subcategory,
            description: model.description,
            severity: parse_column(&model.severity, "reports.severity")?,
            status: parse_column(&model.status, "reports.status")?,
            evidence: from_json(model.evidence, "reports.evidence")?,
            priority_score: model.priority_score,
            reviewed_by: model.reviewed_by.map(UserId),
            reviewed_at: model.reviewed_at.map(|dt| dt.with_timezone(&Utc)),
            resolved_at: model.resolved_at.map(|dt| dt.with_timezone(&Utc)),
            actions_taken: from_json(model.actions_taken, "reports.actions_taken")?,
            admin_notes: model.admin_notes,
            is_anonymous: model.is_anonymous,
            created_at: model.created_at.with_timezone(&Utc),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{ModerationAction, ReportCategory};
    use serde_json::json;
    use uuid::Uuid;

    fn model() -> reports::Model {
        reports::Model {
            id: Uuid::new_v4(),
            reporter_id: Uuid::new_v4(),
            reported_user_id: Uuid::new_v4(),
            category: "harassment".into(),
            subcategory: None,
            description: "Repeated unwanted messages".into(),
            severity: "high".into(),
            status: "under_review".into(),
            evidence: json!([{"evidence_type": "screenshot", "file_path": "e/1.png"}]),
            priority_score: 16,
            reviewed_by: None,
            reviewed_at: None,
            resolved_at: None,
            actions_taken: json!([{"type": "restrict_messaging", "duration": 48}]),
            admin_notes: None,
            is_anonymous: false,
            created_at: Utc::now().fixed_offset(),
        }
    }

    #[test]
    fn converts_model_with_json_columns() {
        let report = Report::try_from(model()).unwrap();
        assert_eq!(report.category, ReportCategory::Harassment);
        assert_eq!(report.status, ReportStatus::UnderReview);
        assert_eq!(report.evidence.len(), 1);
        assert_eq!(
            report.actions_taken,
            vec![ModerationAction::RestrictMessaging { duration: 48 }]
        );
    }

    #[test]
    fn unknown_status_is_an_error() {
        let mut m = model();
        m.status = "archived".into();
        assert!(matches!(
            Report::try_from(m),
            Err(DomainError::Internal(_))
        ));
    }
}
