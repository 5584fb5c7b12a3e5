use tracing::error;

use backend_domain::{format_date, parse_date, ScanEvent};

use crate::{AppError, AppState};

pub async fn list_all(state: &AppState) -> Result<Vec<ScanEvent>, AppError> {
    state.event_repo.fetch_all().await.map_err(|err| {
        error!("failed to fetch scans: {}", err);
        AppError::Internal(err)
    })
}

pub async fn list_today(state: &AppState) -> Result<Vec<ScanEvent>, AppError> {
    let today = format_date(state.clock.now().date());
    fetch_for_date(state, &today).await
}

/// Scans stamped on `date`. A well-formed date with no scans is an empty
/// list, not an error.
pub async fn list_by_date(state: &AppState, date: &str) -> Result<Vec<ScanEvent>, AppError> {
    let date = date.trim();
    parse_date(date).map_err(|err| AppError::BadRequest(format!("invalid date: {}", err)))?;
    fetch_for_date(state, date).await
}

pub async fn latest_located(state: &AppState) -> Result<ScanEvent, AppError> {
    let latest = state
        .event_repo
        .fetch_most_recent_located()
        .await
        .map_err(|err| {
            error!("failed to fetch latest located scan: {}", err);
            AppError::Internal(err)
        })?;
    latest.ok_or_else(|| AppError::NotFound("no scan with a location has been recorded".to_string()))
}

pub(crate) async fn fetch_for_date(
    state: &AppState,
    date: &str,
) -> Result<Vec<ScanEvent>, AppError> {
    state
        .event_repo
        .fetch_by_date_prefix(date)
        .await
        .map_err(|err| {
            error!("failed to fetch scans for {}: {}", date, err);
            AppError::Internal(err)
        })
}
