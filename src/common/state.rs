use std::sync::Arc;

use crate::config::Config;
use crate::error::AppResult;
use crate::history::{self, SharedHistory};
use crate::refresh::RefreshLoop;
use crate::render::RenderHub;
use crate::source::SensorApiClient;

/// Refresh loop wired to the live readings API and the dashboard hub.
pub type Dashboard = RefreshLoop<SensorApiClient, RenderHub>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub history: SharedHistory,
    pub render_hub: Arc<RenderHub>,
    pub refresh: Arc<Dashboard>,
}

impl AppState {
    /// Build the history store, render hub and refresh loop for `config`.
    ///
    /// Nothing is fetched until the refresh loop is started.
    ///
    /// # Errors
    ///
    /// Returns an error if the readings client cannot be created.
    pub fn new(config: Config) -> AppResult<Self> {
        let client = SensorApiClient::new(&config)?;
        let history = history::shared(config.history_capacity);
        let render_hub = Arc::new(RenderHub::new());
        let refresh = Arc::new(RefreshLoop::new(
            client,
            Arc::clone(&history),
            Arc::clone(&render_hub),
        ));

        Ok(Self {
            config: Arc::new(config),
            history,
            render_hub,
            refresh,
        })
    }
}
