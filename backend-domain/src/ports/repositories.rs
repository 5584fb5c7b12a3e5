use async_trait::async_trait;

use crate::entities::{NewScanEvent, ScanEvent};

/// Append-only store of scan events.
///
/// Reads return rows in insertion (`id`) order. "Most recent" means highest
/// timestamp, with the higher `id` winning between rows stamped in the same
/// second.
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn ensure_schema(&self) -> anyhow::Result<()>;
    async fn insert_event(&self, event: &NewScanEvent) -> anyhow::Result<i64>;
    async fn fetch_all(&self) -> anyhow::Result<Vec<ScanEvent>>;
    async fn fetch_by_date_prefix(&self, date: &str) -> anyhow::Result<Vec<ScanEvent>>;
    async fn fetch_most_recent_for(&self, admission_no: &str)
        -> anyhow::Result<Option<ScanEvent>>;
    async fn fetch_most_recent_located(&self) -> anyhow::Result<Option<ScanEvent>>;
    /// Timestamp of the last inserted row, by `id`.
    async fn fetch_latest_timestamp(&self) -> anyhow::Result<Option<String>>;
    async fn ping(&self) -> anyhow::Result<()>;
}
