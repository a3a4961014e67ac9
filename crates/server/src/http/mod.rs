use axum::{Router, routing::get};

use crate::{routes, state::AppState};

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .merge(routes::profile::router())
        .merge(routes::clients::router())
        .merge(routes::projects::router())
        .merge(routes::tasks::router())
        .merge(routes::invoices::router())
        .merge(routes::quota::router())
        .merge(routes::stats::router())
        .merge(routes::errors::router());

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .with_state(state)
}
