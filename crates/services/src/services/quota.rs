use chrono::Utc;
use db::{ConnectionTrait, DatabaseError, models::quota::QuotaUsage};

/// Calendar-month key used as the quota reset boundary.
pub fn current_month() -> String {
    Utc::now().format("%Y-%m").to_string()
}

/// Thin wrapper over the quota ledger that always reconciles the period
/// first, so every decision is made against the current month's counters.
pub struct QuotaService;

impl QuotaService {
    pub async fn usage<C: ConnectionTrait>(db: &C) -> Result<QuotaUsage, DatabaseError> {
        QuotaUsage::reconcile_period(db, &current_month()).await
    }

    pub async fn ai_allowed<C: ConnectionTrait>(db: &C) -> Result<bool, DatabaseError> {
        Ok(Self::usage(db).await?.ai_allowed())
    }

    pub async fn email_allowed<C: ConnectionTrait>(db: &C) -> Result<bool, DatabaseError> {
        Ok(Self::usage(db).await?.email_allowed())
    }

    /// Guarded increment; returns false when the ceiling was hit in the
    /// meantime. Call only after a successful AI generation.
    pub async fn consume_ai<C: ConnectionTrait>(db: &C) -> Result<bool, DatabaseError> {
        Self::usage(db).await?;
        QuotaUsage::consume_ai(db, &current_month()).await
    }

    /// One email unit covers one invoicing event (both recipient sends).
    pub async fn consume_email<C: ConnectionTrait>(db: &C) -> Result<bool, DatabaseError> {
        Self::usage(db).await?;
        QuotaUsage::consume_email(db, &current_month()).await
    }
}
