// Scan event entity
// One badge read: who, when, where, and which direction

use serde::{Deserialize, Deserializer, Serialize};

use crate::value_objects::{Coordinates, ScanType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanEvent {
    pub id: i64,
    pub name: String,
    pub admission_no: String,
    pub scan_type: ScanType,
    pub timestamp: String,
    pub latitude: f64,
    pub longitude: f64,
    pub location: String,
}

impl ScanEvent {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// A scan that has passed validation and been resolved, waiting for its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewScanEvent {
    pub name: String,
    pub admission_no: String,
    pub scan_type: ScanType,
    pub timestamp: String,
    pub coordinates: Coordinates,
    pub location: String,
}

impl NewScanEvent {
    pub fn into_event(self, id: i64) -> ScanEvent {
        ScanEvent {
            id,
            name: self.name,
            admission_no: self.admission_no,
            scan_type: self.scan_type,
            timestamp: self.timestamp,
            latitude: self.coordinates.latitude,
            longitude: self.coordinates.longitude,
            location: self.location,
        }
    }
}

/// Body posted by a reader. Everything is optional here so that missing
/// fields surface as validation errors rather than decode failures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub admission_no: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Reader's own idea of the direction. Recorded direction is always
    /// derived from history instead.
    #[serde(default)]
    pub scan_type: Option<String>,
}

// Some readers send badge numbers as JSON numbers.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
