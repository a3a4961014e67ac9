use std::future::Future;

use anyhow::Error as AnyhowError;
use db::{DatabaseError, DbService};
use server::{AppState, http};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, prelude::*};

const RETRY_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5 * 60);
const RETRY_BATCH_SIZE: u64 = 10;

const DATABASE_URL_ENV: &str = "TASKBILL_DATABASE_URL";
const DEFAULT_DATABASE_URL: &str = "sqlite://taskbill.sqlite?mode=rwc";

#[derive(Debug, Error)]
pub enum TaskBillError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Other(#[from] AnyhowError),
}

fn spawn_background<F>(task: F) -> tokio::task::JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(task)
}

#[tokio::main]
async fn main() -> Result<(), TaskBillError> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},services={level},db={level},utils={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string).expect("Failed to create tracing filter");
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let database_url =
        std::env::var(DATABASE_URL_ENV).unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let db = DbService::new(&database_url).await?;
    let state = AppState::new(db);

    let retry_service = state.invoices.clone();
    spawn_background(async move {
        tracing::info!(
            interval_secs = RETRY_INTERVAL.as_secs(),
            "Starting pending invoice retry job"
        );
        loop {
            tokio::time::sleep(RETRY_INTERVAL).await;
            match retry_service.retry_pending(RETRY_BATCH_SIZE).await {
                Ok(0) => {}
                Ok(resolved) => {
                    tracing::info!(resolved, "Resolved pending invoices");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Pending invoice retry pass failed");
                }
            }
        }
    });

    let app_router = http::router(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(3000);
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    let actual_port = listener.local_addr()?.port();

    tracing::info!("Server running on http://{host}:{actual_port}");

    axum::serve(listener, app_router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to install shutdown signal handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
