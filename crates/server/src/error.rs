use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::{
    DatabaseError,
    models::{
        client::ClientError, invoice::InvoiceError, project::ProjectError, task::TaskError,
    },
};
use services::services::{
    external::ExternalServiceError,
    invoice::{ComposerError, DeliveryError, InvoiceServiceError},
    timer::TimerError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Invoice(#[from] InvoiceError),
    #[error(transparent)]
    Timer(#[from] TimerError),
    #[error(transparent)]
    Invoicing(#[from] InvoiceServiceError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Client(err) => match err {
                ClientError::NotFound => (StatusCode::NOT_FOUND, "ClientError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "ClientError"),
            },
            ApiError::Project(err) => match err {
                ProjectError::NotFound | ProjectError::ClientNotFound => {
                    (StatusCode::NOT_FOUND, "ProjectError")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "ProjectError"),
            },
            ApiError::Task(err) => (task_error_status(err), "TaskError"),
            ApiError::Invoice(err) => match err {
                InvoiceError::NotFound | InvoiceError::TaskNotFound => {
                    (StatusCode::NOT_FOUND, "InvoiceError")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "InvoiceError"),
            },
            ApiError::Timer(err) => match err {
                TimerError::AnotherTimerActive => (StatusCode::CONFLICT, "TimerError"),
                TimerError::Task(task_err) => (task_error_status(task_err), "TimerError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "TimerError"),
            },
            ApiError::Invoicing(err) => match err {
                InvoiceServiceError::TaskNotFound
                | InvoiceServiceError::ProjectNotFound
                | InvoiceServiceError::ClientNotFound => {
                    (StatusCode::NOT_FOUND, "InvoicingError")
                }
                InvoiceServiceError::Composer(composer_err) => match composer_err {
                    ComposerError::TaskNotCompleted => (StatusCode::CONFLICT, "InvoicingError"),
                    ComposerError::MissingClientEmail
                    | ComposerError::MissingFreelancerEmail => {
                        (StatusCode::BAD_REQUEST, "InvoicingError")
                    }
                    _ => (StatusCode::INTERNAL_SERVER_ERROR, "InvoicingError"),
                },
                InvoiceServiceError::Delivery(delivery_err) => match delivery_err {
                    DeliveryError::External(external_err) => match external_err {
                        ExternalServiceError::MissingConfig(_) => {
                            (StatusCode::INTERNAL_SERVER_ERROR, "InvoicingError")
                        }
                        _ => (StatusCode::BAD_GATEWAY, "InvoicingError"),
                    },
                    _ => (StatusCode::INTERNAL_SERVER_ERROR, "InvoicingError"),
                },
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "InvoicingError"),
            },
            ApiError::Database(db_err) => match db_err {
                DatabaseError::RecordNotFound(_) => (StatusCode::NOT_FOUND, "DatabaseError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            },
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
        };

        let error_message = match &self {
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::BadRequest(msg) => msg.clone(),
            other => other.to_string(),
        };

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}

fn task_error_status(err: &TaskError) -> StatusCode {
    match err {
        TaskError::NotFound | TaskError::ProjectNotFound => StatusCode::NOT_FOUND,
        TaskError::AlreadyCompleted => StatusCode::CONFLICT,
        TaskError::NoActiveTimer => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
