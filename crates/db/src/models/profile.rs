use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};
use sea_orm::sea_query::Expr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{entities::user_profile, models::ids};

/// The single freelancer profile of this deployment. Besides identity it
/// carries the `active_task_id` slot used as a compare-and-swap guard for the
/// single-active-timer invariant: a timer may only start by atomically
/// claiming the empty slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub display_name: String,
    pub email: Option<String>,
    pub active_task_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfile {
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl UserProfile {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: user_profile::Model,
    ) -> Result<Self, DbErr> {
        let active_task_id = match model.active_task_id {
            Some(id) => ids::task_uuid_by_id(db, id).await?,
            None => None,
        };
        Ok(Self {
            id: model.uuid,
            display_name: model.display_name,
            email: model.email,
            active_task_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }

    /// Fetches the profile row, creating a default one on first use.
    pub async fn get_or_init<C: ConnectionTrait>(db: &C) -> Result<Self, DbErr> {
        if let Some(model) = user_profile::Entity::find().one(db).await? {
            return Self::from_model(db, model).await;
        }

        let now = Utc::now();
        let active = user_profile::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            display_name: Set("Freelancer".to_string()),
            email: Set(None),
            active_task_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Self::from_model(db, model).await
    }

    pub async fn update<C: ConnectionTrait>(db: &C, data: UpdateProfile) -> Result<Self, DbErr> {
        let current = Self::get_or_init(db).await?;
        let model = user_profile::Entity::find()
            .filter(user_profile::Column::Uuid.eq(current.id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Profile not found".to_string()))?;

        let mut active: user_profile::ActiveModel = model.into();
        if let Some(display_name) = data.display_name {
            active.display_name = Set(display_name);
        }
        if let Some(email) = data.email {
            active.email = Set(Some(email));
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;
        Self::from_model(db, updated).await
    }

    /// Atomically claims the active-timer slot for `task_row_id`. Returns
    /// false when some task already holds the slot; the caller must treat
    /// that as a conflict. Conditional update, so two racing starts cannot
    /// both succeed.
    pub async fn try_claim_active_task<C: ConnectionTrait>(
        db: &C,
        task_row_id: i64,
    ) -> Result<bool, DbErr> {
        // Make sure the singleton row exists before the conditional write.
        Self::get_or_init(db).await?;

        let result = user_profile::Entity::update_many()
            .col_expr(
                user_profile::Column::ActiveTaskId,
                Expr::value(Some(task_row_id)),
            )
            .col_expr(
                user_profile::Column::UpdatedAt,
                Expr::value(Utc::now()),
            )
            .filter(user_profile::Column::ActiveTaskId.is_null())
            .exec(db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Releases the slot if (and only if) it is held by `task_row_id`.
    pub async fn release_active_task<C: ConnectionTrait>(
        db: &C,
        task_row_id: i64,
    ) -> Result<(), DbErr> {
        user_profile::Entity::update_many()
            .col_expr(
                user_profile::Column::ActiveTaskId,
                Expr::value(None::<i64>),
            )
            .col_expr(
                user_profile::Column::UpdatedAt,
                Expr::value(Utc::now()),
            )
            .filter(user_profile::Column::ActiveTaskId.eq(task_row_id))
            .exec(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    #[tokio::test]
    async fn get_or_init_is_idempotent() {
        let db = setup_db().await;
        let first = UserProfile::get_or_init(&db).await.unwrap();
        let second = UserProfile::get_or_init(&db).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn active_task_slot_is_exclusive() {
        let db = setup_db().await;

        assert!(UserProfile::try_claim_active_task(&db, 1).await.unwrap());
        // Second claim loses regardless of which task asks.
        assert!(!UserProfile::try_claim_active_task(&db, 1).await.unwrap());
        assert!(!UserProfile::try_claim_active_task(&db, 2).await.unwrap());

        // Releasing on behalf of the wrong task is a no-op.
        UserProfile::release_active_task(&db, 2).await.unwrap();
        assert!(!UserProfile::try_claim_active_task(&db, 2).await.unwrap());

        UserProfile::release_active_task(&db, 1).await.unwrap();
        assert!(UserProfile::try_claim_active_task(&db, 2).await.unwrap());
    }
}
