use axum::{
    Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::profile::{UpdateProfile, UserProfile};
use utils::response::ApiResponse;

use crate::{error::ApiError, state::AppState};

pub async fn get_profile(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<UserProfile>>, ApiError> {
    let profile = UserProfile::get_or_init(state.conn()).await?;
    Ok(ResponseJson(ApiResponse::success(profile)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfile>,
) -> Result<ResponseJson<ApiResponse<UserProfile>>, ApiError> {
    if matches!(&payload.email, Some(email) if !email.contains('@')) {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }
    let profile = UserProfile::update(state.conn(), payload).await?;
    Ok(ResponseJson(ApiResponse::success(profile)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).put(update_profile))
}
