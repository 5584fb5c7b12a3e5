use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    ingest_requests: AtomicU64,
    scans_recorded: AtomicU64,
    ingest_errors: AtomicU64,
    location_lookups_failed: AtomicU64,
}

impl Metrics {
    pub fn record_ingest_request(&self) {
        self.ingest_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scan(&self) {
        self.scans_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ingest_error(&self) {
        self.ingest_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_location_lookup_failed(&self) {
        self.location_lookups_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn render_prometheus(&self) -> String {
        let requests = self.ingest_requests.load(Ordering::Relaxed);
        let scans = self.scans_recorded.load(Ordering::Relaxed);
        let errors = self.ingest_errors.load(Ordering::Relaxed);
        let lookups_failed = self.location_lookups_failed.load(Ordering::Relaxed);

        format!(
            "# TYPE rollcall_ingest_requests_total counter\n\
rollcall_ingest_requests_total {}\n\
# TYPE rollcall_scans_recorded_total counter\n\
rollcall_scans_recorded_total {}\n\
# TYPE rollcall_ingest_errors_total counter\n\
rollcall_ingest_errors_total {}\n\
# TYPE rollcall_location_lookups_failed_total counter\n\
rollcall_location_lookups_failed_total {}\n",
            requests, scans, errors, lookups_failed
        )
    }
}
