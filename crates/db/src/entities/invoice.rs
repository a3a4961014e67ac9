use sea_orm::entity::prelude::*;

use crate::types::TemplateType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uuid: Uuid,
    pub task_id: i64,
    pub project_id: i64,
    pub client_id: i64,
    pub time_taken_seconds: i64,
    pub hourly_rate: f64,
    pub total_cost: f64,
    pub template_type: TemplateType,
    pub url: String,
    pub emailed: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
