use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;

use backend_application::queries::{export_queries, log_queries};
use backend_application::AppState;
use backend_domain::{DateQuery, ScanEvent};

use crate::error::HttpError;

pub async fn list_logs(State(state): State<AppState>) -> Result<Json<Vec<ScanEvent>>, HttpError> {
    let rows = log_queries::list_all(&state).await?;
    Ok(Json(rows))
}

pub async fn list_today(State(state): State<AppState>) -> Result<Json<Vec<ScanEvent>>, HttpError> {
    let rows = log_queries::list_today(&state).await?;
    Ok(Json(rows))
}

pub async fn list_by_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<Vec<ScanEvent>>, HttpError> {
    let rows = log_queries::list_by_date(&state, &date).await?;
    Ok(Json(rows))
}

pub async fn latest_location(State(state): State<AppState>) -> Result<Json<ScanEvent>, HttpError> {
    let event = log_queries::latest_located(&state).await?;
    Ok(Json(event))
}

pub async fn download_logs(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> Result<Response, HttpError> {
    let export = export_queries::export_csv(&state, query).await?;
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        export.file_name
    ))
    .map_err(|err| HttpError::Internal(err.to_string()))?;
    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/csv; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.body,
    )
        .into_response())
}
