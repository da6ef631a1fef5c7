pub mod dashboard;
pub mod health;
mod rate_limit;
pub mod sensors;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use rate_limit::ClientIpKeyExtractor;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::common::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthz,
        dashboard::get_dashboard,
        dashboard::dashboard_stream,
        dashboard::rerender,
        dashboard::refresh_now,
        sensors::list_sensors,
        sensors::get_sensor_history,
        sensors::get_nearest_reading,
    ),
    components(
        schemas(
            crate::history::Reading,
            crate::render::RenderPass,
            crate::render::RenderReason,
            crate::render::SensorView,
            crate::render::SeriesPoint,
            crate::refresh::TickOutcome,
            sensors::HistoryResponse,
            sensors::HistoryFormat,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "dashboard", description = "Render passes and refresh control"),
        (name = "sensors", description = "Per-sensor rolling history"),
    ),
    info(
        title = "Warehouse Dash API",
        description = "Rolling per-sensor temperature and humidity history",
        version = "0.1.0"
    )
)]
struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let api_routes_base = Router::new()
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/dashboard/stream", get(dashboard::dashboard_stream))
        .route("/render", post(dashboard::rerender))
        .route("/refresh", post(dashboard::refresh_now))
        .route("/sensors", get(sensors::list_sensors))
        .route(
            "/sensors/{sensor_id}/history",
            get(sensors::get_sensor_history),
        )
        .route(
            "/sensors/{sensor_id}/nearest",
            get(sensors::get_nearest_reading),
        );

    let limiter = if config.disable_rate_limiting {
        tracing::warn!("Rate limiting DISABLED");
        None
    } else {
        let built = GovernorConfigBuilder::default()
            .key_extractor(ClientIpKeyExtractor)
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .finish();
        if built.is_none() {
            tracing::error!(
                per_second = config.rate_limit_per_second,
                burst = config.rate_limit_burst,
                "Invalid rate limit settings, rate limiting disabled"
            );
        } else {
            tracing::info!(
                per_second = config.rate_limit_per_second,
                burst = config.rate_limit_burst,
                "Rate limiting configured"
            );
        }
        built
    };

    let api_routes = match limiter {
        Some(limiter) => api_routes_base.layer(GovernorLayer {
            config: Arc::new(limiter),
        }),
        None => api_routes_base,
    }
    .layer(RequestBodyLimitLayer::new(64 * 1024)); // 64KB body limit

    // Page and health check (NO rate limiting)
    let page_routes = Router::new()
        .route("/", get(dashboard::dashboard))
        .route("/healthz", get(health::healthz));

    // OpenAPI documentation
    let docs_routes = Router::new().merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    // Combine all routes
    Router::new()
        .nest("/api", api_routes)
        .merge(page_routes)
        .merge(docs_routes)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
