use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::history::{HistoryStore, Reading};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RenderReason {
    /// A fetched batch was applied
    Poll,
    /// Redraw of every known sensor without fetching
    Resize,
    /// The error indication was raised
    Error,
}

/// One chart point.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub temperature_celsius: f64,
    pub humidity_percent: f64,
}

impl From<&Reading> for SeriesPoint {
    fn from(r: &Reading) -> Self {
        Self {
            timestamp: r.timestamp,
            temperature_celsius: r.temperature_celsius,
            humidity_percent: r.humidity_percent,
        }
    }
}

/// Everything the page needs to draw one sensor card.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SensorView {
    #[serde(rename = "sensorId")]
    pub sensor_id: String,
    pub location: Option<String>,
    /// Current temperature (null when the window is empty)
    pub temperature_celsius: Option<f64>,
    /// Current humidity (null when the window is empty)
    pub humidity_percent: Option<f64>,
    /// Rolling window, oldest first
    pub series: Vec<SeriesPoint>,
}

impl SensorView {
    /// View whose header shows `display` and whose chart is the sensor's window.
    #[must_use]
    pub fn for_reading(store: &HistoryStore, display: &Reading) -> Self {
        Self {
            sensor_id: display.sensor_id.clone(),
            location: display.location.clone(),
            temperature_celsius: Some(display.temperature_celsius),
            humidity_percent: Some(display.humidity_percent),
            series: series_of(store, &display.sensor_id),
        }
    }

    /// View built purely from what the store holds for `sensor_id`.
    #[must_use]
    pub fn from_history(store: &HistoryStore, sensor_id: &str) -> Self {
        let latest = store.latest(sensor_id);
        Self {
            sensor_id: sensor_id.to_string(),
            location: latest.and_then(|r| r.location.clone()),
            temperature_celsius: latest.map(|r| r.temperature_celsius),
            humidity_percent: latest.map(|r| r.humidity_percent),
            series: series_of(store, sensor_id),
        }
    }
}

fn series_of(store: &HistoryStore, sensor_id: &str) -> Vec<SeriesPoint> {
    store
        .snapshot(sensor_id)
        .iter()
        .map(SeriesPoint::from)
        .collect()
}

/// A single render notification.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RenderPass {
    /// Increases by one with every published pass
    pub generation: u64,
    pub reason: RenderReason,
    pub rendered_at: DateTime<Utc>,
    pub sensors: Vec<SensorView>,
    /// Error banner text, if the indication is currently raised
    pub error: Option<String>,
}
