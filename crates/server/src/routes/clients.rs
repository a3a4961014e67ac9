use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::client::{Client, ClientError, CreateClient, UpdateClient};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

pub async fn get_clients(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Client>>>, ApiError> {
    let clients = Client::find_all(state.conn()).await?;
    Ok(ResponseJson(ApiResponse::success(clients)))
}

pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Client>>, ApiError> {
    let client = Client::find_by_id(state.conn(), id)
        .await?
        .ok_or(ClientError::NotFound)?;
    Ok(ResponseJson(ApiResponse::success(client)))
}

pub async fn create_client(
    State(state): State<AppState>,
    Json(payload): Json<CreateClient>,
) -> Result<ResponseJson<ApiResponse<Client>>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Client name is required".to_string()));
    }
    let client = Client::create(state.conn(), &payload, Uuid::new_v4()).await?;
    tracing::info!(client_id = %client.id, "Client created");
    Ok(ResponseJson(ApiResponse::success(client)))
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateClient>,
) -> Result<ResponseJson<ApiResponse<Client>>, ApiError> {
    let client = Client::update(state.conn(), id, payload).await?;
    Ok(ResponseJson(ApiResponse::success(client)))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected = Client::delete(state.conn(), id).await?;
    if rows_affected == 0 {
        return Err(ClientError::NotFound.into());
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router() -> Router<AppState> {
    let client_id_router = Router::new()
        .route("/", get(get_client).put(update_client).delete(delete_client));

    let clients_router = Router::new()
        .route("/", get(get_clients).post(create_client))
        .nest("/{id}", client_id_router);

    Router::new().nest("/clients", clients_router)
}
