use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

/// CSV rendering of one day's scans.
#[derive(Debug, Clone)]
pub struct CsvExport {
    pub file_name: String,
    pub row_count: usize,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub bind_addr: String,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub url: String,
    pub user_agent: String,
    pub attempts: u32,
    pub timeout_seconds: u64,
    pub backoff_millis: u64,
}

impl GeocoderConfig {
    /// Longest a single resolve call can block: every attempt times out and
    /// is followed by a backoff.
    pub fn worst_case_millis(&self) -> u64 {
        u64::from(self.attempts) * (self.timeout_seconds * 1000 + self.backoff_millis)
    }
}
