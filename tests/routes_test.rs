//! HTTP tests against the full router, fed by a local stand-in for the
//! readings API.
//!
//! Run with: cargo test --test routes_test

use axum::{
    body::{Body, BodyDataStream},
    http::{header, Request, StatusCode},
    routing::get,
    Json, Router,
};
use futures::StreamExt;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt;

use warehouse_dash::common::AppState;
use warehouse_dash::config::Config;
use warehouse_dash::refresh::FETCH_ERROR_MESSAGE;
use warehouse_dash::routes::build_router;
use warehouse_dash::source::models::parse_timestamp;
use warehouse_dash::source::{ReadingSource, SensorApiClient};

fn sample_batch() -> Value {
    json!([
        {
            "sensorId": "WH-TEMP-001",
            "location": "Warehouse Zone A",
            "timestamp": "2025-01-01T00:00:00.000000Z",
            "temperature_celsius": 22.4,
            "humidity_percent": 55.1
        },
        {
            "sensorId": "WH-FRZ-003",
            "location": "Freezer Unit 1",
            "timestamp": "2025-01-01T00:00:00.000000Z",
            "temperature_celsius": -18.2,
            "humidity_percent": 90.3
        }
    ])
}

/// Serve a few canned upstream responses on an ephemeral port.
async fn spawn_upstream() -> String {
    let app = Router::new()
        .route("/latest-readings", get(|| async { Json(sample_batch()) }))
        .route(
            "/broken-status",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded") }),
        )
        .route("/broken-body", get(|| async { "<html>not json</html>" }))
        .route(
            "/local-time",
            get(|| async {
                Json(json!([
                    {
                        "sensorId": "A",
                        "timestamp": "2025-01-01T00:00:00",
                        "temperature_celsius": 1.0,
                        "humidity_percent": 2.0
                    },
                    {
                        "sensorId": "B",
                        "timestamp": "2025-01-01 08:30:15.250",
                        "temperature_celsius": 3.0,
                        "humidity_percent": 4.0
                    },
                    {
                        "sensorId": "C",
                        "timestamp": "2025-01-01T02:00:00+02:00",
                        "temperature_celsius": 5.0,
                        "humidity_percent": 6.0
                    }
                ]))
            }),
        )
        .route(
            "/bad-time",
            get(|| async {
                Json(json!([{
                    "sensorId": "A",
                    "timestamp": "yesterday-ish",
                    "temperature_celsius": 1.0,
                    "humidity_percent": 2.0
                }]))
            }),
        )
        .route(
            "/blank-id",
            get(|| async {
                Json(json!([{
                    "sensorId": "",
                    "timestamp": "2025-01-01T00:00:00Z",
                    "temperature_celsius": 1.0,
                    "humidity_percent": 2.0
                }]))
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn test_config(url: String) -> Config {
    Config {
        sensor_api_url: url,
        source_timeout_seconds: 5,
        history_capacity: 3,
        disable_rate_limiting: true,
        ..Config::default()
    }
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>, Option<String>) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, body, content_type)
}

async fn send_json(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let (status, body, _) = send(app, method, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn healthz_and_page_are_served() {
    let base = spawn_upstream().await;
    let app = build_router(AppState::new(test_config(format!("{base}/latest-readings"))).unwrap());

    let (status, _, _) = send(&app, "GET", "/healthz").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body, content_type) = send(&app, "GET", "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/html"));
    let page = String::from_utf8(body).unwrap();
    assert!(page.contains("Warehouse Sensors"));
    // Resizing redraws from cached views instead of broadcasting a pass
    assert!(!page.contains("/api/render"));
    assert!(page.contains("addEventListener('resize'"));
}

#[tokio::test]
async fn refresh_populates_sensors_and_history() {
    let base = spawn_upstream().await;
    let app = build_router(AppState::new(test_config(format!("{base}/latest-readings"))).unwrap());

    let (status, outcome) = send_json(&app, "POST", "/api/refresh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], "applied");
    assert_eq!(outcome["readings"], 2);

    let (status, sensors) = send_json(&app, "GET", "/api/sensors").await;
    assert_eq!(status, StatusCode::OK);
    let sensors = sensors.as_array().unwrap();
    assert_eq!(sensors.len(), 2);
    assert_eq!(sensors[0]["sensorId"], "WH-TEMP-001");
    assert_eq!(sensors[0]["location"], "Warehouse Zone A");
    assert_eq!(sensors[1]["temperature_celsius"], -18.2);

    // Capacity is 3, so four refreshes leave three readings
    for _ in 0..3 {
        send(&app, "POST", "/api/refresh").await;
    }
    let (status, history) = send_json(&app, "GET", "/api/sensors/WH-FRZ-003/history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["capacity"], 3);
    assert_eq!(history["readings"].as_array().unwrap().len(), 3);
    assert_eq!(history["readings"][0]["humidity_percent"], 90.3);
}

#[tokio::test]
async fn unknown_sensor_history_is_empty() {
    let base = spawn_upstream().await;
    let app = build_router(AppState::new(test_config(format!("{base}/latest-readings"))).unwrap());

    let (status, history) = send_json(&app, "GET", "/api/sensors/nope/history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["sensorId"], "nope");
    assert!(history["readings"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn history_exports_csv() {
    let base = spawn_upstream().await;
    let app = build_router(AppState::new(test_config(format!("{base}/latest-readings"))).unwrap());
    send(&app, "POST", "/api/refresh").await;

    let (status, body, content_type) =
        send(&app, "GET", "/api/sensors/WH-TEMP-001/history?format=csv").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/csv"));

    let text = String::from_utf8(body).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("timestamp,temperature_celsius,humidity_percent,location")
    );
    let row = lines.next().unwrap();
    assert!(row.starts_with("2025-01-01T00:00:00+00:00,22.4,55.1,"));
    assert!(row.ends_with("Warehouse Zone A"));
    assert_eq!(lines.next(), None);
}

#[tokio::test]
async fn nearest_reading_lookup() {
    let base = spawn_upstream().await;
    let app = build_router(AppState::new(test_config(format!("{base}/latest-readings"))).unwrap());

    let (status, _) = send_json(
        &app,
        "GET",
        "/api/sensors/WH-TEMP-001/nearest?at=2025-01-01T00:00:05Z",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(&app, "POST", "/api/refresh").await;
    let (status, reading) = send_json(
        &app,
        "GET",
        "/api/sensors/WH-TEMP-001/nearest?at=2025-01-01T00:00:05Z",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reading["temperature_celsius"], 22.4);
}

#[tokio::test]
async fn malformed_queries_are_bad_requests() {
    let base = spawn_upstream().await;
    let app = build_router(AppState::new(test_config(format!("{base}/latest-readings"))).unwrap());

    for uri in [
        "/api/sensors/WH-TEMP-001/nearest?at=not-a-time",
        "/api/sensors/WH-TEMP-001/nearest",
        "/api/sensors/WH-TEMP-001/history?format=xml",
    ] {
        let (status, body) = send_json(&app, "GET", uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()), "{uri}");
    }
}

#[tokio::test]
async fn failed_refresh_raises_single_error_and_keeps_history() {
    let base = spawn_upstream().await;
    let state = AppState::new(test_config(format!("{base}/latest-readings"))).unwrap();
    let app = build_router(state.clone());
    send(&app, "POST", "/api/refresh").await;

    // Point a second state at a failing endpoint but share nothing with the first
    let broken = AppState::new(test_config(format!("{base}/broken-status"))).unwrap();
    let broken_app = build_router(broken.clone());

    for _ in 0..2 {
        let (status, outcome) = send_json(&broken_app, "POST", "/api/refresh").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(outcome["outcome"], "failed");
    }

    let (_, dashboard) = send_json(&broken_app, "GET", "/api/dashboard").await;
    assert_eq!(dashboard["error"], FETCH_ERROR_MESSAGE);
    assert!(dashboard["sensors"].as_array().unwrap().is_empty());
    assert!(broken.history.read().await.is_empty());

    // The healthy state is unaffected
    let (_, dashboard) = send_json(&app, "GET", "/api/dashboard").await;
    assert!(dashboard["error"].is_null());
    assert_eq!(dashboard["sensors"].as_array().unwrap().len(), 2);
    assert_eq!(state.history.read().await.len(), 2);
}

/// Read one server-sent event and return its name and JSON payload.
async fn next_event(body: &mut BodyDataStream) -> (String, Value) {
    let mut buf = String::new();
    while !buf.contains("\n\n") {
        let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
            .await
            .expect("no event within 5s")
            .expect("stream ended")
            .unwrap();
        buf.push_str(std::str::from_utf8(&chunk).unwrap());
    }

    let mut name = String::new();
    let mut data = Value::Null;
    for line in buf.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            name = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("data:") {
            data = serde_json::from_str(rest.trim()).unwrap();
        }
    }
    (name, data)
}

#[tokio::test]
async fn stream_starts_with_current_pass_and_follows_refreshes() {
    let base = spawn_upstream().await;
    let app = build_router(AppState::new(test_config(format!("{base}/latest-readings"))).unwrap());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/dashboard/stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "text/event-stream"
    );
    let mut body = response.into_body().into_data_stream();

    let (name, initial) = next_event(&mut body).await;
    assert_eq!(name, "render");
    assert_eq!(initial["generation"], 0);
    assert!(initial["sensors"].as_array().unwrap().is_empty());

    let (status, _) = send_json(&app, "POST", "/api/refresh").await;
    assert_eq!(status, StatusCode::OK);

    let (name, pass) = next_event(&mut body).await;
    assert_eq!(name, "render");
    assert_eq!(pass["generation"], 1);
    assert_eq!(pass["reason"], "poll");
    assert_eq!(pass["sensors"][0]["sensorId"], "WH-TEMP-001");
    assert_eq!(pass["sensors"][1]["sensorId"], "WH-FRZ-003");
}

#[tokio::test]
async fn rerender_returns_resize_pass() {
    let base = spawn_upstream().await;
    let app = build_router(AppState::new(test_config(format!("{base}/latest-readings"))).unwrap());
    send(&app, "POST", "/api/refresh").await;

    let (status, pass) = send_json(&app, "POST", "/api/render").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pass["reason"], "resize");
    assert_eq!(pass["sensors"].as_array().unwrap().len(), 2);
    assert_eq!(pass["sensors"][0]["series"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn client_maps_upstream_failures() {
    let base = spawn_upstream().await;

    for path in ["broken-status", "broken-body", "blank-id", "bad-time"] {
        let client = SensorApiClient::new(&test_config(format!("{base}/{path}"))).unwrap();
        let err = client.fetch_latest().await.unwrap_err();
        assert!(
            err.to_string().starts_with("Readings source error"),
            "{path}: {err}"
        );
    }

    let unreachable = test_config("http://127.0.0.1:9/latest-readings".into());
    let client = SensorApiClient::new(&unreachable).unwrap();
    assert!(client.fetch_latest().await.is_err());
}

#[tokio::test]
async fn client_parses_readings() {
    let base = spawn_upstream().await;
    let client = SensorApiClient::new(&test_config(format!("{base}/latest-readings"))).unwrap();

    let readings = client.fetch_latest().await.unwrap();
    assert_eq!(readings.len(), 2);
    assert_eq!(readings[0].sensor_id, "WH-TEMP-001");
    assert_eq!(readings[0].location.as_deref(), Some("Warehouse Zone A"));
    assert_eq!(readings[1].temperature_celsius, -18.2);
    assert_eq!(readings[1].timestamp.to_rfc3339(), "2025-01-01T00:00:00+00:00");
}

#[tokio::test]
async fn client_reads_offsetless_timestamps_as_utc() {
    let base = spawn_upstream().await;
    let client = SensorApiClient::new(&test_config(format!("{base}/local-time"))).unwrap();

    let readings = client.fetch_latest().await.unwrap();
    let stamps: Vec<String> = readings.iter().map(|r| r.timestamp.to_rfc3339()).collect();
    assert_eq!(
        stamps,
        vec![
            "2025-01-01T00:00:00+00:00",
            "2025-01-01T08:30:15.250+00:00",
            "2025-01-01T00:00:00+00:00",
        ]
    );
}

#[test]
fn timestamp_parsing_accepts_bare_dates_and_rejects_garbage() {
    let day = parse_timestamp("2025-03-04").unwrap();
    assert_eq!(day.to_rfc3339(), "2025-03-04T00:00:00+00:00");
    assert!(parse_timestamp("2025-13-40T00:00:00").is_none());
    assert!(parse_timestamp("").is_none());
}
