use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use backend_domain::ports::{Clock, EventRepository, GeolocationResolver};
use backend_domain::{Coordinates, NewScanEvent, RuntimeConfig, ScanEvent, LOCATION_UNKNOWN};

use crate::AppState;

#[derive(Default)]
pub struct InMemoryEventRepository {
    rows: Mutex<Vec<ScanEvent>>,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl InMemoryEventRepository {
    pub fn rows(&self) -> Vec<ScanEvent> {
        self.rows.lock().expect("rows").clone()
    }

    fn readable_rows(&self) -> anyhow::Result<Vec<ScanEvent>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            anyhow::bail!("database disk image is malformed");
        }
        Ok(self.rows())
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn ensure_schema(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn insert_event(&self, event: &NewScanEvent) -> anyhow::Result<i64> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("disk I/O error");
        }
        // Yield between the caller's read and this write so missing
        // serialization shows up as broken alternation.
        tokio::task::yield_now().await;
        let mut rows = self.rows.lock().expect("rows");
        let id = rows.last().map(|row| row.id + 1).unwrap_or(1);
        rows.push(event.clone().into_event(id));
        Ok(id)
    }

    async fn fetch_all(&self) -> anyhow::Result<Vec<ScanEvent>> {
        self.readable_rows()
    }

    async fn fetch_by_date_prefix(&self, date: &str) -> anyhow::Result<Vec<ScanEvent>> {
        Ok(self
            .readable_rows()?
            .into_iter()
            .filter(|row| row.timestamp.starts_with(date))
            .collect())
    }

    async fn fetch_most_recent_for(
        &self,
        admission_no: &str,
    ) -> anyhow::Result<Option<ScanEvent>> {
        Ok(self
            .readable_rows()?
            .into_iter()
            .filter(|row| row.admission_no == admission_no)
            .max_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id))))
    }

    async fn fetch_most_recent_located(&self) -> anyhow::Result<Option<ScanEvent>> {
        Ok(self
            .readable_rows()?
            .into_iter()
            .filter(|row| !row.coordinates().is_unknown())
            .max_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id))))
    }

    async fn fetch_latest_timestamp(&self) -> anyhow::Result<Option<String>> {
        Ok(self.readable_rows()?.last().map(|row| row.timestamp.clone()))
    }

    async fn ping(&self) -> anyhow::Result<()> {
        self.readable_rows().map(|_| ())
    }
}

/// Answers every lookup with a fixed place name and counts the calls.
pub struct StaticResolver {
    pub place: String,
    pub calls: AtomicUsize,
}

impl StaticResolver {
    pub fn new(place: &str) -> Self {
        Self {
            place: place.to_string(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl GeolocationResolver for StaticResolver {
    async fn resolve(&self, coordinates: Coordinates) -> String {
        if coordinates.is_unknown() {
            return LOCATION_UNKNOWN.to_string();
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.place.clone()
    }
}

pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        let now = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, second))
            .expect("valid datetime");
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, value: NaiveDateTime) {
        *self.now.lock().expect("clock") = value;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().expect("clock")
    }
}

pub struct Harness {
    pub state: AppState,
    pub repo: Arc<InMemoryEventRepository>,
    pub resolver: Arc<StaticResolver>,
    pub clock: Arc<FixedClock>,
}

pub fn harness() -> Harness {
    let repo = Arc::new(InMemoryEventRepository::default());
    let resolver = Arc::new(StaticResolver::new("Kenyatta Avenue, Nairobi"));
    let clock = Arc::new(FixedClock::at(2024, 5, 1, 7, 15, 0));
    let config = RuntimeConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        max_body_bytes: 65_536,
        request_timeout_seconds: 20,
    };
    let state = AppState::new(config, repo.clone(), resolver.clone(), clock.clone());
    Harness {
        state,
        repo,
        resolver,
        clock,
    }
}

pub fn payload(name: &str, admission_no: &str) -> backend_domain::ScanPayload {
    backend_domain::ScanPayload {
        name: Some(name.to_string()),
        admission_no: Some(admission_no.to_string()),
        ..Default::default()
    }
}
