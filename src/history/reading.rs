use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// One timestamped observation from a sensor.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Reading {
    #[serde(rename = "sensorId")]
    pub sensor_id: String,
    pub timestamp: DateTime<Utc>,
    pub temperature_celsius: f64,
    pub humidity_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Reading {
    #[must_use]
    pub fn new(
        sensor_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        temperature_celsius: f64,
        humidity_percent: f64,
    ) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            timestamp,
            temperature_celsius,
            humidity_percent,
            location: None,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}
