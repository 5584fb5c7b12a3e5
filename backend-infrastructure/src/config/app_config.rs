use std::env;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use backend_domain::{GeocoderConfig, RuntimeConfig};

use crate::config::validation::validate_http_url;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_path: String,
    pub geocoder_url: String,
    pub geocoder_user_agent: String,
    pub geocode_attempts: u32,
    pub geocode_timeout_seconds: u64,
    pub geocode_backoff_millis: u64,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            database_path: "./scan_logs.db".to_string(),
            geocoder_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
            geocoder_user_agent: concat!("rollcall-backend/", env!("CARGO_PKG_VERSION")).to_string(),
            geocode_attempts: 3,
            geocode_timeout_seconds: 3,
            geocode_backoff_millis: 1000,
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 20,
        }
    }
}

impl AppConfig {
    pub async fn load() -> Result<Self> {
        let path = env::var("ROLLCALL_CONFIG").unwrap_or_else(|_| "./config.toml".to_string());
        let file_path = Path::new(&path);
        let base_dir = file_path.parent();
        if !file_path.exists() {
            warn!("config.toml not found, using defaults");
            let mut config = AppConfig::default();
            config.apply_env_overrides()?;
            config.resolve_paths(base_dir);
            config.normalize();
            config.validate()?;
            return Ok(config);
        }
        let content = fs::read_to_string(file_path).await?;
        let mut config: AppConfig = toml::from_str(&content)?;
        config.apply_env_overrides()?;
        config.resolve_paths(base_dir);
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn normalize(&mut self) {
        self.geocoder_url = self.geocoder_url.trim().to_string();
        if self.geocoder_user_agent.trim().is_empty() {
            self.geocoder_user_agent = AppConfig::default().geocoder_user_agent;
        }
    }

    fn resolve_paths(&mut self, base_dir: Option<&Path>) {
        let Some(base) = base_dir else {
            return;
        };
        self.database_path = resolve_path(base, &self.database_path);
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|err| anyhow!("invalid bind_addr: {}", err))?;
        if self.database_path.trim().is_empty() {
            return Err(anyhow!("database_path must not be empty"));
        }
        validate_http_url("geocoder_url", &self.geocoder_url)?;
        if self.geocode_attempts == 0 {
            return Err(anyhow!("geocode_attempts must be greater than 0"));
        }
        if self.geocode_timeout_seconds == 0 {
            return Err(anyhow!("geocode_timeout_seconds must be greater than 0"));
        }
        if self.max_body_bytes == 0 {
            return Err(anyhow!("max_body_bytes must be greater than 0"));
        }
        let geocode_budget_millis = self.to_geocoder_config().worst_case_millis();
        if self.request_timeout_seconds * 1000 <= geocode_budget_millis {
            return Err(anyhow!(
                "request_timeout_seconds ({}) must exceed the geocoding budget of {} ms",
                self.request_timeout_seconds,
                geocode_budget_millis
            ));
        }
        Ok(())
    }

    /// Replaces the port of `bind_addr`, keeping its host.
    pub fn override_port(&mut self, port: u16) -> Result<()> {
        let mut addr: std::net::SocketAddr = self
            .bind_addr
            .parse()
            .map_err(|err| anyhow!("invalid bind_addr: {}", err))?;
        addr.set_port(port);
        self.bind_addr = addr.to_string();
        Ok(())
    }

    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            bind_addr: self.bind_addr.clone(),
            max_body_bytes: self.max_body_bytes,
            request_timeout_seconds: self.request_timeout_seconds,
        }
    }

    pub fn to_geocoder_config(&self) -> GeocoderConfig {
        GeocoderConfig {
            url: self.geocoder_url.clone(),
            user_agent: self.geocoder_user_agent.clone(),
            attempts: self.geocode_attempts,
            timeout_seconds: self.geocode_timeout_seconds,
            backoff_millis: self.geocode_backoff_millis,
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = env::var("ROLLCALL_BIND_ADDR") {
            self.bind_addr = value;
        }
        if let Ok(value) = env::var("ROLLCALL_DATABASE_PATH") {
            self.database_path = value;
        }
        if let Ok(value) = env::var("ROLLCALL_GEOCODER_URL") {
            self.geocoder_url = value;
        }
        if let Ok(value) = env::var("ROLLCALL_GEOCODER_USER_AGENT") {
            self.geocoder_user_agent = value;
        }
        if let Ok(value) = env::var("ROLLCALL_GEOCODE_ATTEMPTS") {
            self.geocode_attempts = parse_override("ROLLCALL_GEOCODE_ATTEMPTS", &value)?;
        }
        if let Ok(value) = env::var("ROLLCALL_GEOCODE_TIMEOUT_SECONDS") {
            self.geocode_timeout_seconds = parse_override("ROLLCALL_GEOCODE_TIMEOUT_SECONDS", &value)?;
        }
        if let Ok(value) = env::var("ROLLCALL_GEOCODE_BACKOFF_MILLIS") {
            self.geocode_backoff_millis = parse_override("ROLLCALL_GEOCODE_BACKOFF_MILLIS", &value)?;
        }
        if let Ok(value) = env::var("ROLLCALL_MAX_BODY_BYTES") {
            self.max_body_bytes = parse_override("ROLLCALL_MAX_BODY_BYTES", &value)?;
        }
        if let Ok(value) = env::var("ROLLCALL_REQUEST_TIMEOUT_SECONDS") {
            self.request_timeout_seconds = parse_override("ROLLCALL_REQUEST_TIMEOUT_SECONDS", &value)?;
        }
        // Hosting platforms hand out the listening port this way.
        if let Ok(value) = env::var("PORT") {
            let port: u16 = value
                .trim()
                .parse()
                .map_err(|err| anyhow!("invalid PORT '{}': {}", value, err))?;
            self.override_port(port)?;
        }
        Ok(())
    }
}

fn parse_override<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err| anyhow!("invalid {} '{}': {}", key, value, err))
}

fn resolve_path(base: &Path, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }
    let path = Path::new(trimmed);
    if path.is_absolute() {
        trimmed.to_string()
    } else {
        base.join(path).to_string_lossy().to_string()
    }
}
