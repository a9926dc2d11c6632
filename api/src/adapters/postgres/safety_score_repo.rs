//! PostgreSQL adapter for SafetyScoreRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use super::{from_json, non_negative, parse_column, to_json};
use crate::domain::entities::safety_score::{
    NEEDS_REVIEW_COMMUNITY_FLAGS, NEEDS_REVIEW_TRUST_THRESHOLD, NEEDS_REVIEW_VERIFIED_REPORTS,
};
use crate::domain::entities::{SafetyScore, UserId};
use crate::domain::ports::SafetyScoreRepository;
use crate::entity::safety_scores;
use crate::error::DomainError;

/// PostgreSQL implementation of SafetyScoreRepository
pub struct PostgresSafetyScoreRepository {
    db: DatabaseConnection,
}

impl PostgresSafetyScoreRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn counter(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Write a score under its row version: version 0 inserts, any other
/// version replaces the row only while it still holds that version
pub(crate) async fn write_score<C: ConnectionTrait>(
    db: &C,
    score: &SafetyScore,
) -> Result<(), DomainError> {
    let mut model = safety_scores::ActiveModel {
        user_id: Set(score.user_id.0),
        trust_score: Set(score.trust_score),
        report_count: Set(counter(score.report_count)),
        verified_report_count: Set(counter(score.verified_report_count)),
        false_report_count: Set(counter(score.false_report_count)),
        community_flags: Set(counter(score.community_flags)),
        positive_feedback: Set(counter(score.positive_feedback)),
        last_incident_date: Set(score.last_incident_date),
        risk_category: Set(score.risk_category.to_string()),
        score_breakdown: Set(to_json(&score.score_breakdown)?),
        last_calculated_at: Set(score.last_calculated_at.fixed_offset()),
        version: Set(score.version + 1),
    };

    if score.version == 0 {
        let inserted = safety_scores::Entity::insert(model)
            .on_conflict(
                OnConflict::column(safety_scores::Column::UserId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;
        if inserted == 0 {
            return Err(DomainError::ConcurrentUpdate(format!(
                "Safety score for {} already exists",
                score.user_id
            )));
        }
        return Ok(());
    }

    model.user_id = NotSet;
    let result = safety_scores::Entity::update_many()
        .set(model)
        .filter(safety_scores::Column::UserId.eq(score.user_id.0))
        .filter(safety_scores::Column::Version.eq(score.version))
        .exec(db)
        .await
        .map_err(|e| DomainError::Database(e.to_string()))?;

    if result.rows_affected == 0 {
        return Err(DomainError::ConcurrentUpdate(format!(
            "Safety score for {} changed since it was read",
            score.user_id
        )));
    }
    Ok(())
}

#[async_trait]
impl SafetyScoreRepository for PostgresSafetyScoreRepository {
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<SafetyScore>, DomainError> {
        let result = safety_scores::Entity::find_by_id(user_id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        result.map(SafetyScore::try_from).transpose()
    }

    async fn find_needs_review(&self, limit: u64) -> Result<Vec<SafetyScore>, DomainError> {
        let results = safety_scores::Entity::find()
            .filter(
                Condition::any()
                    .add(safety_scores::Column::TrustScore.lt(NEEDS_REVIEW_TRUST_THRESHOLD))
                    .add(
                        safety_scores::Column::VerifiedReportCount
                            .gte(counter(NEEDS_REVIEW_VERIFIED_REPORTS)),
                    )
                    .add(
                        safety_scores::Column::CommunityFlags
                            .gte(counter(NEEDS_REVIEW_COMMUNITY_FLAGS)),
                    ),
            )
            .order_by_asc(safety_scores::Column::TrustScore)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        results.into_iter().map(SafetyScore::try_from).collect()
    }
}

/// Convert SeaORM model to domain entity, rejecting negative counters
impl TryFrom<safety_scores::Model> for SafetyScore {
    type Error = DomainError;

    fn try_from(model: safety_scores::Model) -> Result<Self, Self::Error> {
        Ok(SafetyScore {
            user_id: UserId(model.user_id),
            trust_score: model.trust_score,
            report_count: non_negative(model.report_count, "safety_scores.report_count")?,
            verified_report_count: non_negative(
                model.verified_report_count,
                "safety_scores.verified_report_count",
            )?,
            false_report_count: non_negative(
                model.false_report_count,
                "safety_scores.false_report_count",
            )?,
            community_flags: non_negative(model.community_flags, "safety_scores.community_flags")?,
            positive_feedback: non_negative(
                model.positive_feedback,
                "safety_scores.positive_feedback",
            )?,
            last_incident_date: model.last_incident_date,
            risk_category: parse_column(&model.risk_category, "safety_scores.risk_category")?,
            score_breakdown: from_json(model.score_breakdown, "safety_scores.score_breakdown")?,
            last_calculated_at: model.last_calculated_at.with_timezone(&Utc),
            version: model.version,
        })
    }
}
