use std::sync::Arc;

use backend_domain::ports::{Clock, EventRepository, GeolocationResolver};
use backend_domain::RuntimeConfig;
use tokio::sync::Mutex;

use crate::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub event_repo: Arc<dyn EventRepository>,
    pub resolver: Arc<dyn GeolocationResolver>,
    pub clock: Arc<dyn Clock>,
    /// Held from "read latest row" through "insert" so that concurrent scans
    /// cannot both observe the same previous direction.
    pub ingest_lock: Arc<Mutex<()>>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: RuntimeConfig,
        event_repo: Arc<dyn EventRepository>,
        resolver: Arc<dyn GeolocationResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            event_repo,
            resolver,
            clock,
            ingest_lock: Arc::new(Mutex::new(())),
            metrics: Arc::new(Metrics::default()),
        }
    }
}
