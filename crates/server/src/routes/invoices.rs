use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::invoice::{Invoice, InvoiceError};
use serde::Serialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Serialize)]
pub struct DownloadUrlResponse {
    pub url: String,
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Invoice>>, ApiError> {
    let invoice = Invoice::find_by_id(state.conn(), id)
        .await?
        .ok_or(InvoiceError::NotFound)?;
    Ok(ResponseJson(ApiResponse::success(invoice)))
}

pub async fn get_download_url(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<DownloadUrlResponse>>, ApiError> {
    let url = state.invoices.download_url(id).await?;
    Ok(ResponseJson(ApiResponse::success(DownloadUrlResponse {
        url,
    })))
}

pub fn router() -> Router<AppState> {
    let invoice_id_router = Router::new()
        .route("/", get(get_invoice))
        .route("/download-url", get(get_download_url));

    Router::new().nest("/invoices/{id}", invoice_id_router)
}
