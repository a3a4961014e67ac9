use sea_orm::entity::prelude::*;

use crate::types::{Priority, TaskStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uuid: Uuid,
    pub project_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<DateTimeUtc>,
    /// Accumulated work time in seconds. Non-decreasing until the task is
    /// completed, frozen afterwards.
    pub time_taken_seconds: i64,
    /// Wall-clock instant the current run started. Null when no timer runs.
    pub started_at: Option<DateTimeUtc>,
    pub invoice_id: Option<i64>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
