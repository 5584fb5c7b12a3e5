use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use backend_domain::ports::GeolocationResolver;
use backend_domain::{
    Coordinates, GeocoderConfig, LOCATION_LOOKUP_FAILED, LOCATION_NOT_FOUND, LOCATION_UNKNOWN,
};

/// Waits between failed lookup attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Deserialize)]
struct ReverseGeocodeResponse {
    display_name: Option<String>,
}

/// Reverse geocoder speaking the Nominatim `/reverse` protocol.
pub struct NominatimResolver {
    client: Client,
    config: GeocoderConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl NominatimResolver {
    pub fn new(config: GeocoderConfig) -> Result<Self> {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(config: GeocoderConfig, sleeper: Arc<dyn Sleeper>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            config,
            sleeper,
        })
    }

    async fn lookup_once(&self, coordinates: Coordinates) -> Result<String> {
        let response = self
            .client
            .get(&self.config.url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", coordinates.latitude.to_string()),
                ("lon", coordinates.longitude.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;
        let body: ReverseGeocodeResponse = response.json().await?;
        Ok(body
            .display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| LOCATION_NOT_FOUND.to_string()))
    }
}

#[async_trait]
impl GeolocationResolver for NominatimResolver {
    async fn resolve(&self, coordinates: Coordinates) -> String {
        // (0, 0) would come back as a point in the Gulf of Guinea.
        if coordinates.is_unknown() {
            return LOCATION_UNKNOWN.to_string();
        }
        let backoff = Duration::from_millis(self.config.backoff_millis);
        let location = retry_lookup(self.config.attempts, backoff, self.sleeper.as_ref(), || {
            self.lookup_once(coordinates)
        })
        .await;
        debug!(
            latitude = coordinates.latitude,
            longitude = coordinates.longitude,
            location = %location,
            "coordinates resolved"
        );
        location
    }
}

/// Runs `lookup` up to `attempts` times, sleeping `backoff` between failures.
/// Exhausting every attempt yields [`LOCATION_LOOKUP_FAILED`].
pub async fn retry_lookup<F, Fut>(
    attempts: u32,
    backoff: Duration,
    sleeper: &dyn Sleeper,
    mut lookup: F,
) -> String
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    for attempt in 1..=attempts {
        match lookup().await {
            Ok(location) => return location,
            Err(err) => {
                warn!(attempt, attempts, "reverse geocode attempt failed: {:#}", err);
                if attempt < attempts {
                    sleeper.sleep(backoff).await;
                }
            }
        }
    }
    LOCATION_LOOKUP_FAILED.to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::{Json, Router};
    use serde_json::json;
    use tokio::net::TcpListener;

    use super::*;

    #[derive(Default)]
    struct RecordingSleeper {
        naps: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        fn naps(&self) -> Vec<Duration> {
            self.naps.lock().expect("naps").clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.naps.lock().expect("naps").push(duration);
        }
    }

    #[derive(Clone, Copy)]
    enum Reply {
        Named,
        Unnamed,
        FailThenNamed(usize),
        Slow,
    }

    #[derive(Clone)]
    struct Upstream {
        reply: Reply,
        hits: Arc<AtomicUsize>,
    }

    async fn reverse(
        State(upstream): State<Upstream>,
        Query(params): Query<HashMap<String, String>>,
    ) -> axum::response::Response {
        let hit = upstream.hits.fetch_add(1, Ordering::SeqCst) + 1;
        let named = Json(json!({
            "display_name": format!("Moi Avenue ({}, {})", params["lat"], params["lon"])
        }));
        match upstream.reply {
            Reply::Named => named.into_response(),
            Reply::Unnamed => Json(json!({"error": "Unable to geocode"})).into_response(),
            Reply::FailThenNamed(failures) if hit <= failures => {
                StatusCode::SERVICE_UNAVAILABLE.into_response()
            }
            Reply::FailThenNamed(_) => named.into_response(),
            Reply::Slow => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                named.into_response()
            }
        }
    }

    async fn spawn_upstream(reply: Reply) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/reverse", axum::routing::get(reverse))
            .with_state(Upstream {
                reply,
                hits: hits.clone(),
            });
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{}/reverse", addr), hits)
    }

    fn config(url: String, attempts: u32) -> GeocoderConfig {
        GeocoderConfig {
            url,
            user_agent: "rollcall-test".to_string(),
            attempts,
            timeout_seconds: 1,
            backoff_millis: 1000,
        }
    }

    #[tokio::test]
    async fn unknown_coordinates_skip_the_network() {
        let (url, hits) = spawn_upstream(Reply::Named).await;
        let sleeper = Arc::new(RecordingSleeper::default());
        let resolver =
            NominatimResolver::with_sleeper(config(url, 3), sleeper.clone()).expect("resolver");
        let location = resolver.resolve(Coordinates::new(0.0, 0.0)).await;
        assert_eq!(location, LOCATION_UNKNOWN);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(sleeper.naps().is_empty());
    }

    #[tokio::test]
    async fn returns_display_name() {
        let (url, hits) = spawn_upstream(Reply::Named).await;
        let resolver = NominatimResolver::with_sleeper(
            config(url, 3),
            Arc::new(RecordingSleeper::default()),
        )
        .expect("resolver");
        let location = resolver.resolve(Coordinates::new(-1.28, 36.82)).await;
        assert_eq!(location, "Moi Avenue (-1.28, 36.82)");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_display_name_is_not_found() {
        let (url, _) = spawn_upstream(Reply::Unnamed).await;
        let resolver = NominatimResolver::with_sleeper(
            config(url, 3),
            Arc::new(RecordingSleeper::default()),
        )
        .expect("resolver");
        let location = resolver.resolve(Coordinates::new(10.0, 10.0)).await;
        assert_eq!(location, LOCATION_NOT_FOUND);
    }

    #[tokio::test]
    async fn retries_with_backoff_until_success() {
        let (url, hits) = spawn_upstream(Reply::FailThenNamed(2)).await;
        let sleeper = Arc::new(RecordingSleeper::default());
        let resolver =
            NominatimResolver::with_sleeper(config(url, 3), sleeper.clone()).expect("resolver");
        let location = resolver.resolve(Coordinates::new(1.5, 2.5)).await;
        assert_eq!(location, "Moi Avenue (1.5, 2.5)");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.naps(), vec![Duration::from_secs(1); 2]);
    }

    #[tokio::test]
    async fn unreachable_service_degrades_to_failed_label() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let sleeper = Arc::new(RecordingSleeper::default());
        let resolver = NominatimResolver::with_sleeper(
            config(format!("http://{}/reverse", addr), 3),
            sleeper.clone(),
        )
        .expect("resolver");
        let location = resolver.resolve(Coordinates::new(1.0, 1.0)).await;
        assert_eq!(location, LOCATION_LOOKUP_FAILED);
        assert_eq!(sleeper.naps().len(), 2);
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let (url, hits) = spawn_upstream(Reply::Slow).await;
        let resolver = NominatimResolver::with_sleeper(
            config(url, 1),
            Arc::new(RecordingSleeper::default()),
        )
        .expect("resolver");
        let started = std::time::Instant::now();
        let location = resolver.resolve(Coordinates::new(1.0, 1.0)).await;
        assert_eq!(location, LOCATION_LOOKUP_FAILED);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn retry_lookup_counts_attempts() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicUsize::new(0);
        let location = retry_lookup(4, Duration::from_millis(250), &sleeper, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<String, _>(anyhow::anyhow!("connection reset")) }
        })
        .await;
        assert_eq!(location, LOCATION_LOOKUP_FAILED);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(sleeper.naps(), vec![Duration::from_millis(250); 3]);
    }
}
