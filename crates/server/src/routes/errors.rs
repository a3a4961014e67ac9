use axum::{
    Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::error_log::ErrorLog;
use serde::Deserialize;
use utils::response::ApiResponse;

use crate::{error::ApiError, state::AppState};

const DEFAULT_LIMIT: u64 = 50;

#[derive(Debug, Deserialize)]
pub struct ErrorLogQuery {
    pub limit: Option<u64>,
}

pub async fn get_errors(
    State(state): State<AppState>,
    Query(query): Query<ErrorLogQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<ErrorLog>>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(500);
    let entries = ErrorLog::recent(state.conn(), limit).await?;
    Ok(ResponseJson(ApiResponse::success(entries)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/errors", get(get_errors))
}
