use tracing::{debug, error, info, warn};

use backend_domain::{
    format_timestamp, infer_scan_type, Coordinates, NewScanEvent, ScanEvent, ScanPayload,
    LOCATION_LOOKUP_FAILED,
};

use crate::{AppError, AppState};

struct ValidScan {
    name: String,
    admission_no: String,
    coordinates: Coordinates,
    claimed_type: Option<String>,
}

/// Records one badge read.
///
/// Location lookup happens first and outside the ingest lock since it may
/// block for the whole retry budget. Direction inference, timestamping and
/// the insert all happen under the lock.
pub async fn record_scan(state: &AppState, payload: ScanPayload) -> Result<ScanEvent, AppError> {
    state.metrics.record_ingest_request();
    let scan = validate_scan(payload).map_err(|err| {
        state.metrics.record_ingest_error();
        err
    })?;

    let location = state.resolver.resolve(scan.coordinates).await;
    if location == LOCATION_LOOKUP_FAILED {
        state.metrics.record_location_lookup_failed();
    }

    let event = {
        let _guard = state.ingest_lock.lock().await;
        let scan_type = infer_scan_type(state.event_repo.as_ref(), &scan.admission_no)
            .await
            .map_err(|err| storage_failure(state, "failed to read latest scan", err))?;
        if let Some(claimed) = scan.claimed_type.as_deref() {
            if !claimed.eq_ignore_ascii_case(scan_type.as_str()) {
                debug!(
                    admission_no = %scan.admission_no,
                    claimed,
                    inferred = %scan_type,
                    "reader direction ignored"
                );
            }
        }
        let timestamp = next_timestamp(state).await?;
        let new_event = NewScanEvent {
            name: scan.name,
            admission_no: scan.admission_no,
            scan_type,
            timestamp,
            coordinates: scan.coordinates,
            location,
        };
        let id = state
            .event_repo
            .insert_event(&new_event)
            .await
            .map_err(|err| storage_failure(state, "failed to insert scan", err))?;
        new_event.into_event(id)
    };

    state.metrics.record_scan();
    info!(
        id = event.id,
        admission_no = %event.admission_no,
        scan_type = %event.scan_type,
        location = %event.location,
        "scan recorded"
    );
    Ok(event)
}

/// Clock reading for a new row, never earlier than the last stored one.
/// Must be called under the ingest lock.
async fn next_timestamp(state: &AppState) -> Result<String, AppError> {
    let now = format_timestamp(state.clock.now());
    let last = state
        .event_repo
        .fetch_latest_timestamp()
        .await
        .map_err(|err| storage_failure(state, "failed to read latest timestamp", err))?;
    match last {
        // Fixed-width format, so text order is time order.
        Some(last) if last > now => {
            warn!(now = %now, last = %last, "clock behind last scan, reusing last timestamp");
            Ok(last)
        }
        _ => Ok(now),
    }
}

fn validate_scan(payload: ScanPayload) -> Result<ValidScan, AppError> {
    let name = required_text(payload.name, "name")?;
    let admission_no = required_text(payload.admission_no, "admissionNo")?;
    let coordinates = Coordinates::new(
        payload.latitude.unwrap_or(0.0),
        payload.longitude.unwrap_or(0.0),
    );
    if !coordinates.is_valid() {
        warn!(
            latitude = coordinates.latitude,
            longitude = coordinates.longitude,
            "rejected scan with out-of-range coordinates"
        );
        return Err(AppError::BadRequest(
            "latitude must be within [-90, 90] and longitude within [-180, 180]".to_string(),
        ));
    }
    let claimed_type = payload
        .scan_type
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
    Ok(ValidScan {
        name,
        admission_no,
        coordinates,
        claimed_type,
    })
}

fn required_text(value: Option<String>, field: &str) -> Result<String, AppError> {
    match value.as_deref().map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => Ok(trimmed.to_string()),
        _ => Err(AppError::BadRequest(format!("{} is required", field))),
    }
}

fn storage_failure(state: &AppState, context: &str, err: anyhow::Error) -> AppError {
    state.metrics.record_ingest_error();
    error!("{}: {:#}", context, err);
    AppError::Internal(err.context(context.to_string()))
}
