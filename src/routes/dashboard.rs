use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse,
    },
    Json,
};
use futures::{stream, Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;

use crate::common::AppState;
use crate::refresh::TickOutcome;
use crate::render::RenderPass;

/// Dashboard page
pub async fn dashboard() -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "public, max-age=60")],
        Html(DASHBOARD_HTML),
    )
}

/// Current render state
///
/// Latest view of every sensor seen so far, plus the error banner text.
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Current render state", body = RenderPass),
    ),
    tag = "dashboard"
)]
pub async fn get_dashboard(State(state): State<AppState>) -> Json<RenderPass> {
    Json(state.render_hub.current())
}

fn render_event(pass: &RenderPass) -> Option<Result<Event, Infallible>> {
    match Event::default().event("render").json_data(pass) {
        Ok(ev) => Some(Ok(ev)),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize render pass for SSE");
            None
        }
    }
}

/// Live render passes as server-sent events
///
/// The first event is the current state; every later event is one
/// published pass.
#[utoipa::path(
    get,
    path = "/api/dashboard/stream",
    responses(
        (
            status = 200,
            description = "Stream of `render` events",
            content_type = "text/event-stream"
        ),
    ),
    tag = "dashboard"
)]
pub async fn dashboard_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe before taking the snapshot so nothing falls in between
    let rx = state.render_hub.subscribe();
    let initial = state.render_hub.current();

    let updates = BroadcastStream::new(rx).filter_map(|res| async move {
        match res {
            Ok(pass) => Some(pass),
            Err(e) => {
                tracing::debug!(error = %e, "Dashboard subscriber lagging");
                None
            }
        }
    });

    let events = stream::once(async move { initial })
        .chain(updates)
        .filter_map(|pass| async move { render_event(&pass) });

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Re-render every known sensor
///
/// Publishes a pass built from the current history to every subscriber
/// without contacting the readings source. The page itself redraws
/// locally on resize and never calls this.
#[utoipa::path(
    post,
    path = "/api/render",
    responses(
        (status = 200, description = "Pass that was published", body = RenderPass),
    ),
    tag = "dashboard"
)]
pub async fn rerender(State(state): State<AppState>) -> Json<RenderPass> {
    Json(state.refresh.on_resize().await)
}

/// Run a refresh cycle now
///
/// Returns 409 if a cycle is already fetching and 502 if the readings
/// source failed.
#[utoipa::path(
    post,
    path = "/api/refresh",
    responses(
        (status = 200, description = "Batch applied", body = TickOutcome),
        (status = 409, description = "A refresh is already in flight", body = TickOutcome),
        (status = 502, description = "Readings source failed", body = TickOutcome),
    ),
    tag = "dashboard"
)]
pub async fn refresh_now(State(state): State<AppState>) -> impl IntoResponse {
    let outcome = state.refresh.tick().await;
    let status = match outcome {
        TickOutcome::Applied { .. } => StatusCode::OK,
        TickOutcome::Skipped => StatusCode::CONFLICT,
        TickOutcome::Failed { .. } => StatusCode::BAD_GATEWAY,
    };
    (status, Json(outcome))
}

const DASHBOARD_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Warehouse Sensors</title>
    <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/uplot@1.6.31/dist/uPlot.min.css">
    <style>
        :root {
            --bg: #f8fafc;
            --surface: #ffffff;
            --border: #e2e8f0;
            --text: #1e293b;
            --muted: #64748b;
            --temp: #2563eb;
            --hum: #059669;
            --danger: #dc2626;
        }
        * { box-sizing: border-box; margin: 0; padding: 0; }
        body { font-family: system-ui, -apple-system, sans-serif; background: var(--bg); color: var(--text); min-height: 100vh; }

        .container {
            max-width: 1400px;
            margin: 0 auto;
            padding: 1.5rem;
        }
        header {
            display: flex;
            justify-content: space-between;
            align-items: center;
            margin-bottom: 1.5rem;
        }
        h1 { font-size: 1.25rem; font-weight: 600; }
        .status { font-size: 0.75rem; color: var(--muted); }

        #dashboard-container {
            display: grid;
            grid-template-columns: repeat(auto-fill, minmax(380px, 1fr));
            gap: 1rem;
        }
        .chart-container {
            background: var(--surface);
            border: 1px solid var(--border);
            border-radius: 0.75rem;
            padding: 1rem 1.25rem;
            display: flex;
            flex-direction: column;
        }
        .chart-container h2 { font-size: 1.1rem; font-weight: 600; }
        .chart-container .location { font-size: 0.8rem; color: var(--muted); margin-bottom: 0.75rem; }
        .readout {
            display: flex;
            justify-content: space-around;
            margin-bottom: 0.75rem;
            font-weight: 500;
        }
        .readout .temp { color: var(--temp); }
        .readout .hum { color: var(--hum); }
        .chart-svg-container { width: 100%; }

        #loading-message, #error-message {
            grid-column: 1 / -1;
            text-align: center;
            padding: 1rem;
            border-radius: 0.5rem;
        }
        #loading-message { color: var(--muted); }
        #error-message {
            color: var(--danger);
            background: #fee2e2;
            font-size: 1.05rem;
        }
        .hidden { display: none !important; }

        .tooltip {
            position: absolute;
            pointer-events: none;
            background: rgba(30, 41, 59, 0.9);
            color: white;
            font-size: 0.75rem;
            padding: 0.35rem 0.5rem;
            border-radius: 0.25rem;
            opacity: 0;
            transition: opacity 0.1s;
            z-index: 100;
        }
        .tooltip.active { opacity: 1; }
    </style>
</head>
<body>
<div class="container">
    <header>
        <h1>Warehouse Sensors</h1>
        <span class="status" id="status">connecting...</span>
    </header>
    <div id="dashboard-container">
        <div id="loading-message">Loading sensor data...</div>
        <div id="error-message" class="hidden"></div>
    </div>
</div>
<div class="tooltip" id="tooltip"></div>

<script src="https://cdn.jsdelivr.net/npm/uplot@1.6.31/dist/uPlot.iife.min.js"></script>
<script>
const CHART_HEIGHT = 220;

const state = {
    charts: {},   // sensorId -> uPlot instance
    views: {},    // sensorId -> latest SensorView
};

const tooltip = document.getElementById('tooltip');

function debounce(fn, ms) {
    let t;
    return (...args) => {
        clearTimeout(t);
        t = setTimeout(() => fn(...args), ms);
    };
}

function fmtTime(secs) {
    return new Date(secs * 1000).toLocaleTimeString([], { hour12: false });
}

function fmt(v, unit) {
    return v == null ? '--' : v.toFixed(1) + unit;
}

function cardId(sensorId) {
    return 'sensor-chart-' + sensorId;
}

function ensureCard(view) {
    let card = document.getElementById(cardId(view.sensorId));
    if (!card) {
        card = document.createElement('div');
        card.id = cardId(view.sensorId);
        card.className = 'chart-container';
        card.innerHTML = `
            <h2></h2>
            <p class="location"></p>
            <div class="readout">
                <span class="temp">Temp: <span class="temp-value"></span></span>
                <span class="hum">Humidity: <span class="humidity-value"></span></span>
            </div>
            <div class="chart-svg-container"></div>
        `;
        card.querySelector('h2').textContent = view.sensorId;
        document.getElementById('dashboard-container').appendChild(card);
    }
    return card;
}

function renderChart(view, card) {
    const area = card.querySelector('.chart-svg-container');
    const times = view.series.map(p => Date.parse(p.timestamp) / 1000);
    const temps = view.series.map(p => p.temperature_celsius);

    if (state.charts[view.sensorId]) {
        state.charts[view.sensorId].destroy();
    }
    area.innerHTML = '';

    const opts = {
        title: `Sensor ${view.sensorId} Temperature`,
        width: Math.max(area.clientWidth, 200),
        height: CHART_HEIGHT,
        scales: {
            x: { time: true },
            y: {
                range: (u, min, max) => [min - 2, max + 2],
            },
        },
        axes: [
            { stroke: '#64748b', grid: { stroke: '#e2e8f0' }, values: (u, vals) => vals.map(fmtTime) },
            { stroke: '#2563eb', grid: { stroke: '#e2e8f0' }, size: 50, label: 'Temperature (°C)' },
        ],
        series: [
            {},
            { label: 'Temperature', stroke: '#2563eb', width: 2 },
        ],
        legend: { show: false },
        hooks: {
            // uPlot snaps the cursor index to the nearest point in time
            setCursor: [
                (u) => {
                    const idx = u.cursor.idx;
                    if (idx == null) {
                        tooltip.classList.remove('active');
                        return;
                    }
                    const bbox = u.over.getBoundingClientRect();
                    tooltip.innerHTML = `Time: ${fmtTime(times[idx])}<br/>Temp: ${fmt(temps[idx], '°C')}`;
                    tooltip.style.left = (bbox.left + window.scrollX + u.cursor.left + 10) + 'px';
                    tooltip.style.top = (bbox.top + window.scrollY + u.cursor.top - 20) + 'px';
                    tooltip.classList.add('active');
                },
            ],
        },
    };

    state.charts[view.sensorId] = new uPlot(opts, [times, temps], area);
    area.addEventListener('mouseleave', () => tooltip.classList.remove('active'));
}

function applyView(view) {
    state.views[view.sensorId] = view;
    const card = ensureCard(view);
    card.querySelector('.location').textContent = view.location || '';
    card.querySelector('.temp-value').textContent = fmt(view.temperature_celsius, '°C');
    card.querySelector('.humidity-value').textContent = fmt(view.humidity_percent, '%');
    renderChart(view, card);
}

function applyError(message) {
    const banner = document.getElementById('error-message');
    if (message) {
        banner.textContent = message;
        banner.classList.remove('hidden');
    } else {
        banner.classList.add('hidden');
    }
}

function applyPass(pass) {
    if (pass.sensors.length || pass.error) {
        document.getElementById('loading-message').classList.add('hidden');
    }
    pass.sensors.forEach(applyView);
    applyError(pass.error);
    document.getElementById('status').textContent =
        `pass #${pass.generation} at ${new Date(pass.rendered_at).toLocaleTimeString([], { hour12: false })}`;
}

async function init() {
    try {
        const response = await fetch('/api/dashboard');
        if (response.ok) {
            applyPass(await response.json());
        }
    } catch (error) {
        console.error('Failed to load dashboard state:', error);
    }

    const events = new EventSource('/api/dashboard/stream');
    events.addEventListener('render', (ev) => applyPass(JSON.parse(ev.data)));
    events.onerror = () => {
        document.getElementById('status').textContent = 'reconnecting...';
    };
}

// Resizing only affects this viewport, so redraw from the cached views
window.addEventListener('resize', debounce(() => {
    Object.values(state.views).forEach((view) => {
        const card = document.getElementById(cardId(view.sensorId));
        if (card) {
            renderChart(view, card);
        }
    });
}, 150));

init();
</script>
</body>
</html>
"##;
