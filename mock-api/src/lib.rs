//! Simulated readings source for local development.
//!
//! Serves `GET /latest-readings` in the same shape as the real sensor API.
//! Each call nudges every sensor's temperature and humidity by a small
//! random step, clamped to a plausible band for that kind of space.

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tower_http::cors::{Any, CorsLayer};

/// Largest temperature step per reading, in degrees
pub const TEMP_FLUCTUATION: f64 = 0.5;
/// Largest humidity step per reading, in percent
pub const HUM_FLUCTUATION: f64 = 2.0;

#[derive(Debug, Clone, Copy)]
pub struct SensorSpec {
    pub sensor_id: &'static str,
    pub location: &'static str,
    pub initial_temperature: f64,
    pub initial_humidity: f64,
}

pub const SENSORS: [SensorSpec; 5] = [
    SensorSpec {
        sensor_id: "WH-TEMP-001",
        location: "Warehouse Zone A",
        initial_temperature: 22.0,
        initial_humidity: 55.0,
    },
    SensorSpec {
        sensor_id: "WH-HUM-002",
        location: "Loading Dock",
        initial_temperature: 28.0,
        initial_humidity: 70.0,
    },
    SensorSpec {
        sensor_id: "WH-FRZ-003",
        location: "Freezer Unit 1",
        initial_temperature: -18.0,
        initial_humidity: 90.0,
    },
    SensorSpec {
        sensor_id: "WH-DRY-004",
        location: "Dry Storage",
        initial_temperature: 25.0,
        initial_humidity: 40.0,
    },
    SensorSpec {
        sensor_id: "WH-OFF-005",
        location: "Office Area",
        initial_temperature: 20.0,
        initial_humidity: 50.0,
    },
];

#[derive(Debug, Clone, Serialize)]
pub struct MockReading {
    #[serde(rename = "sensorId")]
    pub sensor_id: String,
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub temperature_celsius: f64,
    pub humidity_percent: f64,
}

/// Keep a value pair inside the band for this sensor.
///
/// Freezer sensors (id contains `FRZ`) get their own range.
#[must_use]
pub fn clamp_for(sensor_id: &str, temperature: f64, humidity: f64) -> (f64, f64) {
    if sensor_id.contains("FRZ") {
        (temperature.clamp(-25.0, -10.0), humidity.clamp(80.0, 100.0))
    } else {
        (temperature.clamp(15.0, 35.0), humidity.clamp(30.0, 80.0))
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[derive(Debug)]
struct SensorValue {
    spec: SensorSpec,
    temperature: f64,
    humidity: f64,
}

/// Random-walk state of every simulated sensor.
#[derive(Debug)]
pub struct Simulator {
    sensors: Vec<SensorValue>,
}

impl Simulator {
    #[must_use]
    pub fn new(specs: &[SensorSpec]) -> Self {
        Self {
            sensors: specs
                .iter()
                .map(|spec| SensorValue {
                    spec: *spec,
                    temperature: spec.initial_temperature,
                    humidity: spec.initial_humidity,
                })
                .collect(),
        }
    }

    /// Advance every sensor one step and report it, all stamped with `now`.
    pub fn next_readings<R: Rng>(
        &mut self,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Vec<MockReading> {
        self.sensors
            .iter_mut()
            .map(|s| {
                let temperature =
                    s.temperature + rng.random_range(-TEMP_FLUCTUATION..=TEMP_FLUCTUATION);
                let humidity = s.humidity + rng.random_range(-HUM_FLUCTUATION..=HUM_FLUCTUATION);
                let (temperature, humidity) = clamp_for(s.spec.sensor_id, temperature, humidity);

                s.temperature = temperature;
                s.humidity = humidity;

                MockReading {
                    sensor_id: s.spec.sensor_id.to_string(),
                    location: s.spec.location.to_string(),
                    timestamp: now,
                    temperature_celsius: round1(temperature),
                    humidity_percent: round1(humidity),
                }
            })
            .collect()
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(&SENSORS)
    }
}

pub type SharedSimulator = Arc<Mutex<Simulator>>;

async fn latest_readings(State(sim): State<SharedSimulator>) -> Json<Vec<MockReading>> {
    let data = {
        let mut sim = sim.lock().unwrap_or_else(PoisonError::into_inner);
        sim.next_readings(&mut rand::rng(), Utc::now())
    };
    tracing::info!(sensors = data.len(), "Serving latest readings");
    Json(data)
}

pub fn build_router(sim: SharedSimulator) -> Router {
    Router::new()
        .route("/latest-readings", get(latest_readings))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(sim)
}
