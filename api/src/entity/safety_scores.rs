//! `safety_scores` table, one row per user

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "safety_scores")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,
    pub trust_score: i32,
    pub report_count: i32,
    pub verified_report_count: i32,
    pub false_report_count: i32,
    pub community_flags: i32,
    pub positive_feedback: i32,
    pub last_incident_date: Option<Date>,
    pub risk_category: String,
    pub score_breakdown: Json,
    pub last_calculated_at: DateTimeWithTimeZone,
    /// Bumped by every write; guards read-modify-write cycles
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
