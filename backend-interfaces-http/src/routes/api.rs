use axum::Router;

use backend_application::AppState;

use crate::handlers::{ingest_handlers, ops_handlers, query_handlers};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/scan", axum::routing::post(ingest_handlers::record_scan))
        .route("/logs", axum::routing::get(query_handlers::list_logs))
        .route("/logs/today", axum::routing::get(query_handlers::list_today))
        .route("/logs/:date", axum::routing::get(query_handlers::list_by_date))
        .route(
            "/last_location",
            axum::routing::get(query_handlers::latest_location),
        )
        .route(
            "/latest_location",
            axum::routing::get(query_handlers::latest_location),
        )
        .route(
            "/download_logs",
            axum::routing::get(query_handlers::download_logs),
        )
        .route(
            "/ops/health/live",
            axum::routing::get(ops_handlers::health_live),
        )
        .route(
            "/ops/health/ready",
            axum::routing::get(ops_handlers::health_ready),
        )
        .route(
            "/ops/metrics/prometheus",
            axum::routing::get(ops_handlers::metrics_prometheus),
        )
        .with_state(state)
}
