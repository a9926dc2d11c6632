//! `moderated_users` table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "moderated_users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_status: String,
    pub safety_score: i32,
    pub is_flagged: bool,
    pub restrictions: Json,
    pub suspended_until: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub ban_reason: Option<String>,
    pub last_safety_check: Option<DateTimeWithTimeZone>,
    /// Bumped by every write; guards read-modify-write cycles
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
