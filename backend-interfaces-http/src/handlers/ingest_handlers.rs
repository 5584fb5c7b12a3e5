use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use backend_application::commands::ingest_commands;
use backend_application::AppState;
use backend_domain::ScanEvent;

use crate::error::HttpError;
use crate::middleware::parse_scan_payload;

#[derive(Serialize)]
pub struct ScanAccepted {
    pub message: String,
    pub event: ScanEvent,
}

pub async fn record_scan(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<ScanAccepted>, HttpError> {
    let payload = parse_scan_payload(&headers, &body, state.config.max_body_bytes).map_err(|err| {
        warn!("failed to parse scan body: {}", err);
        state.metrics.record_ingest_request();
        state.metrics.record_ingest_error();
        HttpError::BadRequest(format!("invalid scan payload: {}", err))
    })?;

    let event = ingest_commands::record_scan(&state, payload).await?;
    Ok(Json(ScanAccepted {
        message: "Scan recorded successfully".to_string(),
        event,
    }))
}
