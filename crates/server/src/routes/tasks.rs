use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::task::{Task, TaskError, UpdateTask};
use services::services::{invoice::InvoiceReceipt, timer::TimerService};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = Task::find_by_id(state.conn(), id)
        .await?
        .ok_or(TaskError::NotFound)?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = Task::update(state.conn(), id, payload).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected = Task::delete(state.conn(), id).await?;
    if rows_affected == 0 {
        return Err(TaskError::NotFound.into());
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn start_timer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = TimerService::start(state.conn(), id).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn pause_timer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = TimerService::pause(state.conn(), id).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn complete_timer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = TimerService::complete(state.conn(), id).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn generate_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<InvoiceReceipt>>, ApiError> {
    let receipt = state.invoices.generate_for_task(id).await?;
    let message = receipt.message.clone();
    Ok(ResponseJson(ApiResponse::success_with_message(
        receipt, message,
    )))
}

pub fn router() -> Router<AppState> {
    let task_id_router = Router::new()
        .route("/", get(get_task).put(update_task).delete(delete_task))
        .route("/timer/start", post(start_timer))
        .route("/timer/pause", post(pause_timer))
        .route("/timer/complete", post(complete_timer))
        .route("/invoice", post(generate_invoice));

    Router::new().nest("/tasks/{id}", task_id_router)
}
