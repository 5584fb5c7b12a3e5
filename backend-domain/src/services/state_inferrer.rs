// Entry/exit inference
// The store is the state table: a badge's current side is whatever its
// latest row says.

use crate::ports::EventRepository;
use crate::value_objects::ScanType;

pub async fn infer_scan_type(
    repo: &dyn EventRepository,
    admission_no: &str,
) -> anyhow::Result<ScanType> {
    let previous = repo.fetch_most_recent_for(admission_no).await?;
    Ok(ScanType::following(previous.map(|event| event.scan_type)))
}
