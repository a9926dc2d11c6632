//! `reports` table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub reported_user_id: Uuid,
    pub category: String,
    pub subcategory: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub severity: String,
    pub status: String,
    /// Array of evidence references
    pub evidence: Json,
    pub priority_score: i32,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTimeWithTimeZone>,
    pub resolved_at: Option<DateTimeWithTimeZone>,
    /// Array of tagged moderation actions
    pub actions_taken: Json,
    #[sea_orm(column_type = "Text", nullable)]
    pub admin_notes: Option<String>,
    pub is_anonymous: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
