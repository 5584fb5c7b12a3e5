use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use backend_application::AppState;
use backend_domain::EventRepository;
use backend_infrastructure::{AppConfig, LocalClock, NominatimResolver, SqliteEventRepository};

pub struct AppContext {
    pub state: AppState,
}

impl AppContext {
    pub async fn new() -> Result<Self> {
        let config = AppConfig::load().await?;
        Self::with_config(config).await
    }

    pub async fn with_config(config: AppConfig) -> Result<Self> {
        info!(
            bind_addr = %config.bind_addr,
            database_path = %config.database_path,
            geocoder_url = %config.geocoder_url,
            geocode_attempts = config.geocode_attempts,
            "config loaded"
        );

        let repo = Arc::new(SqliteEventRepository::open(&config.database_path).await?);
        repo.ensure_schema().await?;

        let resolver = Arc::new(NominatimResolver::new(config.to_geocoder_config())?);

        let state = AppState::new(
            config.to_runtime_config(),
            repo,
            resolver,
            Arc::new(LocalClock),
        );

        Ok(Self { state })
    }
}
