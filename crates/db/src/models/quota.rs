use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    Set,
};
use sea_orm::sea_query::{Expr, ExprTrait};
use serde::{Deserialize, Serialize};

use crate::entities::quota_usage;

/// Free-tier ceiling for AI-generated invoices per calendar month.
pub const AI_MONTHLY_LIMIT: i64 = 2;
/// Free-tier ceiling for invoice email events per calendar month.
pub const EMAIL_MONTHLY_LIMIT: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaUsage {
    pub month: String,
    pub ai_count: i64,
    pub email_count: i64,
    pub is_subscribed: bool,
}

impl QuotaUsage {
    fn from_model(model: quota_usage::Model) -> Self {
        Self {
            month: model.month,
            ai_count: model.ai_count,
            email_count: model.email_count,
            is_subscribed: model.is_subscribed,
        }
    }

    pub fn ai_allowed(&self) -> bool {
        self.is_subscribed || self.ai_count < AI_MONTHLY_LIMIT
    }

    pub fn email_allowed(&self) -> bool {
        self.is_subscribed || self.email_count < EMAIL_MONTHLY_LIMIT
    }

    async fn model<C: ConnectionTrait>(
        db: &C,
        month: &str,
    ) -> Result<quota_usage::Model, DbErr> {
        if let Some(model) = quota_usage::Entity::find().one(db).await? {
            return Ok(model);
        }

        let now = Utc::now();
        let active = quota_usage::ActiveModel {
            month: Set(month.to_string()),
            ai_count: Set(0),
            email_count: Set(0),
            is_subscribed: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        active.insert(db).await
    }

    /// Rolls the ledger into `current_month` if its key is stale, resetting
    /// both counters to zero before any allow/deny decision can be made.
    /// Idempotent within a month.
    pub async fn reconcile_period<C: ConnectionTrait>(
        db: &C,
        current_month: &str,
    ) -> Result<Self, DbErr> {
        let model = Self::model(db, current_month).await?;
        if model.month == current_month {
            return Ok(Self::from_model(model));
        }

        tracing::info!(
            stale_month = %model.month,
            current_month,
            "Rolling quota period forward"
        );

        let mut active: quota_usage::ActiveModel = model.into();
        active.month = Set(current_month.to_string());
        active.ai_count = Set(0);
        active.email_count = Set(0);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;
        Ok(Self::from_model(updated))
    }

    /// Guarded increment of the AI counter: applies only while the ceiling is
    /// not reached (or the user is subscribed), in a single conditional
    /// UPDATE so racing callers cannot overshoot. Returns whether it applied.
    pub async fn consume_ai<C: ConnectionTrait>(db: &C, month: &str) -> Result<bool, DbErr> {
        let result = quota_usage::Entity::update_many()
            .col_expr(
                quota_usage::Column::AiCount,
                Expr::col(quota_usage::Column::AiCount).add(1),
            )
            .col_expr(quota_usage::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(quota_usage::Column::Month.eq(month))
            .filter(
                Condition::any()
                    .add(quota_usage::Column::IsSubscribed.eq(true))
                    .add(quota_usage::Column::AiCount.lt(AI_MONTHLY_LIMIT)),
            )
            .exec(db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Same as [`Self::consume_ai`] for the email counter. One unit covers
    /// one invoicing event (the client + freelancer pair of sends).
    pub async fn consume_email<C: ConnectionTrait>(db: &C, month: &str) -> Result<bool, DbErr> {
        let result = quota_usage::Entity::update_many()
            .col_expr(
                quota_usage::Column::EmailCount,
                Expr::col(quota_usage::Column::EmailCount).add(1),
            )
            .col_expr(quota_usage::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(quota_usage::Column::Month.eq(month))
            .filter(
                Condition::any()
                    .add(quota_usage::Column::IsSubscribed.eq(true))
                    .add(quota_usage::Column::EmailCount.lt(EMAIL_MONTHLY_LIMIT)),
            )
            .exec(db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn set_subscribed<C: ConnectionTrait>(
        db: &C,
        month: &str,
        subscribed: bool,
    ) -> Result<Self, DbErr> {
        let model = Self::model(db, month).await?;
        let mut active: quota_usage::ActiveModel = model.into();
        active.is_subscribed = Set(subscribed);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;
        Ok(Self::from_model(updated))
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
    async fn stale_month_resets_counters_before_any_decision() {
        let db = setup_db().await;

        let usage = QuotaUsage::reconcile_period(&db, "2026-07").await.unwrap();
        assert_eq!(usage.month, "2026-07");
        QuotaUsage::consume_ai(&db, "2026-07").await.unwrap();
        QuotaUsage::consume_email(&db, "2026-07").await.unwrap();

        let usage = QuotaUsage::reconcile_period(&db, "2026-08").await.unwrap();
        assert_eq!(usage.month, "2026-08");
        assert_eq!(usage.ai_count, 0);
        assert_eq!(usage.email_count, 0);
        assert!(usage.ai_allowed());
    }

    #[tokio::test]
    async fn ai_counter_stops_at_free_tier_ceiling() {
        let db = setup_db().await;
        QuotaUsage::reconcile_period(&db, "2026-08").await.unwrap();

        assert!(QuotaUsage::consume_ai(&db, "2026-08").await.unwrap());
        assert!(QuotaUsage::consume_ai(&db, "2026-08").await.unwrap());
        // Third attempt hits the ceiling; the guarded update does not apply.
        assert!(!QuotaUsage::consume_ai(&db, "2026-08").await.unwrap());

        let usage = QuotaUsage::reconcile_period(&db, "2026-08").await.unwrap();
        assert_eq!(usage.ai_count, AI_MONTHLY_LIMIT);
        assert!(!usage.ai_allowed());
    }

    #[tokio::test]
    async fn subscription_lifts_both_ceilings() {
        let db = setup_db().await;
        QuotaUsage::reconcile_period(&db, "2026-08").await.unwrap();
        QuotaUsage::set_subscribed(&db, "2026-08", true).await.unwrap();

        for _ in 0..10 {
            assert!(QuotaUsage::consume_ai(&db, "2026-08").await.unwrap());
            assert!(QuotaUsage::consume_email(&db, "2026-08").await.unwrap());
        }

        let usage = QuotaUsage::reconcile_period(&db, "2026-08").await.unwrap();
        assert!(usage.ai_allowed());
        assert!(usage.email_allowed());
    }
}
