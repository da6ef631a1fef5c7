use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};

use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::history::Reading;
use crate::render::SensorView;

use super::types::{CsvRow, HistoryFormat, HistoryQuery, HistoryResponse, NearestQuery};

/// List all known sensors
///
/// Every sensor seen since startup with its current values and window,
/// in the order they first appeared.
#[utoipa::path(
    get,
    path = "/api/sensors",
    responses(
        (status = 200, description = "Sensors retrieved successfully", body = Vec<SensorView>),
    ),
    tag = "sensors"
)]
pub async fn list_sensors(State(state): State<AppState>) -> Json<Vec<SensorView>> {
    let history = state.history.read().await;
    let views = history
        .sensor_ids()
        .iter()
        .map(|id| SensorView::from_history(&history, id))
        .collect();
    Json(views)
}

fn build_csv(readings: &[Reading]) -> AppResult<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for r in readings {
        wtr.serialize(CsvRow {
            timestamp: r.timestamp.to_rfc3339(),
            temperature_celsius: r.temperature_celsius,
            humidity_percent: r.humidity_percent,
            location: r.location.as_deref().unwrap_or(""),
        })
        .map_err(|e| AppError::Internal(format!("CSV write failed: {e}")))?;
    }
    wtr.into_inner()
        .map_err(|e| AppError::Internal(format!("CSV flush failed: {e}")))
}

/// Get a sensor's rolling window
///
/// Unknown sensors return an empty window rather than 404.
#[utoipa::path(
    get,
    path = "/api/sensors/{sensor_id}/history",
    params(
        ("sensor_id" = String, Path, description = "Sensor identifier"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "History retrieved successfully", body = HistoryResponse),
        (status = 400, description = "Unknown export format"),
    ),
    tag = "sensors"
)]
pub async fn get_sensor_history(
    State(state): State<AppState>,
    Path(sensor_id): Path<String>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) = query?;
    let (capacity, readings) = {
        let history = state.history.read().await;
        (history.capacity(), history.snapshot(&sensor_id))
    };

    match query.format {
        HistoryFormat::Json => Ok(Json(HistoryResponse {
            sensor_id,
            capacity,
            readings,
        })
        .into_response()),
        HistoryFormat::Csv => {
            let body = build_csv(&readings)?;
            Response::builder()
                .header(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"))
                .body(axum::body::Body::from(body))
                .map_err(|e| AppError::Internal(e.to_string()))
        }
    }
}

/// Find the reading closest to an instant
///
/// Used for chart tooltips. On a tie the earlier reading is returned.
#[utoipa::path(
    get,
    path = "/api/sensors/{sensor_id}/nearest",
    params(
        ("sensor_id" = String, Path, description = "Sensor identifier"),
        NearestQuery
    ),
    responses(
        (status = 200, description = "Closest reading", body = Reading),
        (status = 400, description = "`at` is missing or not a timestamp"),
        (status = 404, description = "Sensor unknown or has no readings"),
    ),
    tag = "sensors"
)]
pub async fn get_nearest_reading(
    State(state): State<AppState>,
    Path(sensor_id): Path<String>,
    query: Result<Query<NearestQuery>, QueryRejection>,
) -> AppResult<Json<Reading>> {
    let Query(query) = query?;
    let history = state.history.read().await;
    history
        .nearest(&sensor_id, query.at)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No readings for sensor '{sensor_id}'")))
}
