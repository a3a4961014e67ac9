use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::invoice::{EarningsSummary, Invoice};
use utils::response::ApiResponse;

use crate::{error::ApiError, state::AppState};

pub async fn get_earnings(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<EarningsSummary>>, ApiError> {
    let summary = Invoice::earnings_summary(state.conn()).await?;
    Ok(ResponseJson(ApiResponse::success(summary)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/stats/earnings", get(get_earnings))
}
