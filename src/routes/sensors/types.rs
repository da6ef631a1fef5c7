use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::history::Reading;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HistoryFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Response format: json (default) or csv
    #[serde(default)]
    pub format: HistoryFormat,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    #[serde(rename = "sensorId")]
    pub sensor_id: String,
    /// Maximum number of readings kept per sensor
    pub capacity: usize,
    /// Rolling window, oldest first (empty for unknown sensors)
    pub readings: Vec<Reading>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct NearestQuery {
    /// Instant to look up (RFC 3339)
    pub at: DateTime<Utc>,
}

/// One CSV row of a sensor's history
#[derive(Debug, Serialize)]
pub(super) struct CsvRow<'a> {
    pub timestamp: String,
    pub temperature_celsius: f64,
    pub humidity_percent: f64,
    pub location: &'a str,
}
