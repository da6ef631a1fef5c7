use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;
use crate::history::Reading;

/// One entry of the `latest-readings` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireReading {
    #[serde(rename = "sensorId")]
    pub sensor_id: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub temperature_celsius: f64,
    pub humidity_percent: f64,
    #[serde(default)]
    pub location: Option<String>,
}

const LOCAL_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse an ISO-8601 timestamp. Values without an offset are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unparseable timestamp: {raw}")))
}

/// Response from `GET /latest-readings`
pub type LatestReadingsResponse = Vec<WireReading>;

impl TryFrom<WireReading> for Reading {
    type Error = AppError;

    fn try_from(wire: WireReading) -> Result<Self, Self::Error> {
        if wire.sensor_id.trim().is_empty() {
            return Err(AppError::Source(
                "Reading with empty sensorId in response".to_string(),
            ));
        }

        Ok(Self {
            sensor_id: wire.sensor_id,
            timestamp: wire.timestamp,
            temperature_celsius: wire.temperature_celsius,
            humidity_percent: wire.humidity_percent,
            // Blank labels are treated as absent
            location: wire.location.filter(|l| !l.is_empty()),
        })
    }
}

/// Convert a whole response body, failing the batch on the first bad entry.
///
/// # Errors
///
/// Returns `AppError::Source` if any entry is malformed.
pub fn into_readings(body: LatestReadingsResponse) -> Result<Vec<Reading>, AppError> {
    body.into_iter().map(Reading::try_from).collect()
}
