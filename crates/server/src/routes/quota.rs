use axum::{
    Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, put},
};
use db::models::quota::{AI_MONTHLY_LIMIT, EMAIL_MONTHLY_LIMIT, QuotaUsage};
use serde::{Deserialize, Serialize};
use services::services::quota::{QuotaService, current_month};
use utils::response::ApiResponse;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Serialize)]
pub struct QuotaSnapshot {
    pub month: String,
    pub ai_count: i64,
    pub ai_limit: i64,
    pub email_count: i64,
    pub email_limit: i64,
    pub is_subscribed: bool,
    pub ai_allowed: bool,
    pub email_allowed: bool,
}

impl From<QuotaUsage> for QuotaSnapshot {
    fn from(usage: QuotaUsage) -> Self {
        Self {
            ai_allowed: usage.ai_allowed(),
            email_allowed: usage.email_allowed(),
            month: usage.month,
            ai_count: usage.ai_count,
            ai_limit: AI_MONTHLY_LIMIT,
            email_count: usage.email_count,
            email_limit: EMAIL_MONTHLY_LIMIT,
            is_subscribed: usage.is_subscribed,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubscription {
    pub subscribed: bool,
}

pub async fn get_quota(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<QuotaSnapshot>>, ApiError> {
    let usage = QuotaService::usage(state.conn()).await?;
    Ok(ResponseJson(ApiResponse::success(usage.into())))
}

pub async fn update_subscription(
    State(state): State<AppState>,
    Json(payload): Json<UpdateSubscription>,
) -> Result<ResponseJson<ApiResponse<QuotaSnapshot>>, ApiError> {
    QuotaUsage::set_subscribed(state.conn(), &current_month(), payload.subscribed).await?;
    let usage = QuotaService::usage(state.conn()).await?;
    Ok(ResponseJson(ApiResponse::success(usage.into())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/quota", get(get_quota))
        .route("/quota/subscription", put(update_subscription))
}
