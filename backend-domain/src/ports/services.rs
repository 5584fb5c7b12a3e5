use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::value_objects::Coordinates;

#[async_trait]
pub trait GeolocationResolver: Send + Sync {
    /// Place name for the coordinates, or one of the sentinel labels in
    /// [`crate::value_objects::location`]. Never fails.
    async fn resolve(&self, coordinates: Coordinates) -> String;
}

pub trait Clock: Send + Sync {
    /// Wall-clock time in the server's local zone.
    fn now(&self) -> NaiveDateTime;
}
