use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, QueryOrder, QuerySelect, Set};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::error_log;

/// Durable record of a recovered failure, kept for later inspection.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorLog {
    pub id: Uuid,
    pub service: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl ErrorLog {
    fn from_model(model: error_log::Model) -> Self {
        Self {
            id: model.uuid,
            service: model.service,
            message: model.message,
            created_at: model.created_at,
        }
    }

    pub async fn record<C: ConnectionTrait>(
        db: &C,
        service: &str,
        message: &str,
    ) -> Result<(), DbErr> {
        let active = error_log::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            service: Set(service.to_string()),
            message: Set(message.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        active.insert(db).await?;
        Ok(())
    }

    pub async fn recent<C: ConnectionTrait>(db: &C, limit: u64) -> Result<Vec<Self>, DbErr> {
        let models = error_log::Entity::find()
            .order_by_desc(error_log::Column::CreatedAt)
            .limit(limit)
            .all(db)
            .await?;
        Ok(models.into_iter().map(Self::from_model).collect())
    }
}
