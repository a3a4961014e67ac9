use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{entities::pending_invoice, models::ids};

/// Retry queue for invoicing attempts that failed at the render/store step,
/// the one failure path with no fallback. A background job re-runs these.
#[derive(Debug, Clone, Serialize)]
pub struct PendingInvoice {
    pub id: Uuid,
    pub task_id: Uuid,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PendingInvoice {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: pending_invoice::Model,
    ) -> Result<Self, DbErr> {
        let task_uuid = ids::task_uuid_by_id(db, model.task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;
        Ok(Self {
            id: model.uuid,
            task_id: task_uuid,
            attempts: model.attempts,
            last_error: model.last_error,
            created_at: model.created_at,
        })
    }

    /// Enqueues a retry record for the task, or refreshes the error on the
    /// existing unresolved one so a task never queues twice.
    pub async fn enqueue<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        error: &str,
    ) -> Result<(), DbErr> {
        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;

        let existing = pending_invoice::Entity::find()
            .filter(pending_invoice::Column::TaskId.eq(task_row_id))
            .filter(pending_invoice::Column::ResolvedAt.is_null())
            .one(db)
            .await?;

        let now = Utc::now();
        if let Some(record) = existing {
            let mut active: pending_invoice::ActiveModel = record.into();
            active.last_error = Set(Some(error.to_string()));
            active.updated_at = Set(now);
            active.update(db).await?;
            return Ok(());
        }

        let active = pending_invoice::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            task_id: Set(task_row_id),
            attempts: Set(0),
            last_error: Set(Some(error.to_string())),
            resolved_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        active.insert(db).await?;
        Ok(())
    }

    pub async fn fetch_unresolved<C: ConnectionTrait>(
        db: &C,
        limit: u64,
    ) -> Result<Vec<Self>, DbErr> {
        let models = pending_invoice::Entity::find()
            .filter(pending_invoice::Column::ResolvedAt.is_null())
            .order_by_asc(pending_invoice::Column::CreatedAt)
            .limit(limit)
            .all(db)
            .await?;
        let mut pending = Vec::with_capacity(models.len());
        for model in models {
            pending.push(Self::from_model(db, model).await?);
        }
        Ok(pending)
    }

    pub async fn mark_resolved<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<(), DbErr> {
        let record = pending_invoice::Entity::find()
            .filter(pending_invoice::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound(
                "Pending invoice not found".to_string(),
            ))?;
        let mut active: pending_invoice::ActiveModel = record.into();
        active.resolved_at = Set(Some(Utc::now()));
        active.updated_at = Set(Utc::now());
        active.update(db).await?;
        Ok(())
    }

    pub async fn mark_failed<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        error: &str,
    ) -> Result<(), DbErr> {
        let record = pending_invoice::Entity::find()
            .filter(pending_invoice::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound(
                "Pending invoice not found".to_string(),
            ))?;
        let attempts = record.attempts + 1;
        let mut active: pending_invoice::ActiveModel = record.into();
        active.attempts = Set(attempts);
        active.last_error = Set(Some(error.to_string()));
        active.updated_at = Set(Utc::now());
        active.update(db).await?;
        Ok(())
    }
}
