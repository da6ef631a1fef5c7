use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::history::{HistoryStore, Reading, SharedHistory};
use crate::render::{RenderPass, RenderReason, Renderer, SensorView};
use crate::source::ReadingSource;

/// Banner text shown when a refresh cycle fails
pub const FETCH_ERROR_MESSAGE: &str =
    "Failed to load sensor data. Please check the API connection.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Fetching,
}

/// Result of a single refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    /// The batch was recorded and rendered
    Applied { readings: usize, sensors: usize },
    /// The fetch failed; history was left untouched
    Failed { message: String },
    /// Another cycle was still fetching
    Skipped,
}

/// Resets the fetching flag when a cycle ends, including when its future
/// is dropped mid-fetch.
struct FetchingGuard<'a>(&'a AtomicBool);

impl Drop for FetchingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives fetch -> record -> render cycles.
///
/// Cycles never overlap: a tick that arrives while another is fetching
/// is skipped rather than queued.
pub struct RefreshLoop<S, R> {
    source: S,
    history: SharedHistory,
    renderer: Arc<R>,
    fetching: AtomicBool,
    error_shown: AtomicBool,
}

impl<S, R> RefreshLoop<S, R>
where
    S: ReadingSource,
    R: Renderer,
{
    pub fn new(source: S, history: SharedHistory, renderer: Arc<R>) -> Self {
        Self {
            source,
            history,
            renderer,
            fetching: AtomicBool::new(false),
            error_shown: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn state(&self) -> LoopState {
        if self.fetching.load(Ordering::Acquire) {
            LoopState::Fetching
        } else {
            LoopState::Idle
        }
    }

    /// Run one refresh cycle.
    pub async fn tick(&self) -> TickOutcome {
        if self
            .fetching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Refresh already in flight, skipping tick");
            return TickOutcome::Skipped;
        }
        let _guard = FetchingGuard(&self.fetching);

        match self.source.fetch_latest().await {
            Ok(batch) => {
                let readings = batch.len();

                // Publish before releasing the lock so a concurrent resize
                // cannot render an older window over this pass
                let mut history = self.history.write().await;
                let views = apply_batch(&mut history, batch);

                if self.error_shown.swap(false, Ordering::AcqRel) {
                    tracing::info!("Readings source recovered");
                    self.renderer.clear_error();
                }

                let pass = self.renderer.render(RenderReason::Poll, views);
                drop(history);

                tracing::debug!(
                    readings,
                    sensors = pass.sensors.len(),
                    generation = pass.generation,
                    "Refresh cycle applied"
                );
                TickOutcome::Applied {
                    readings,
                    sensors: pass.sensors.len(),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Refresh cycle failed");
                if !self.error_shown.swap(true, Ordering::AcqRel) {
                    self.renderer.show_error(FETCH_ERROR_MESSAGE);
                }
                TickOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Re-render every known sensor from its current window, without fetching.
    ///
    /// The read lock is held until the pass is published, so a batch
    /// applied meanwhile always renders after it.
    pub async fn on_resize(&self) -> RenderPass {
        let history = self.history.read().await;
        let views: Vec<SensorView> = history
            .sensor_ids()
            .iter()
            .map(|id| SensorView::from_history(&history, id))
            .collect();

        self.renderer.render(RenderReason::Resize, views)
    }
}

/// Record a batch in response order and build the views for it.
///
/// A sensor appearing more than once in a batch gets one view, headed by
/// its last reading.
fn apply_batch(history: &mut HistoryStore, batch: Vec<Reading>) -> Vec<SensorView> {
    let mut display: Vec<Reading> = Vec::new();
    let mut slot: HashMap<String, usize> = HashMap::new();

    for reading in batch {
        match slot.get(&reading.sensor_id) {
            Some(&i) => display[i] = reading.clone(),
            None => {
                slot.insert(reading.sensor_id.clone(), display.len());
                display.push(reading.clone());
            }
        }
        history.record(reading);
    }

    display
        .iter()
        .map(|r| SensorView::for_reading(history, r))
        .collect()
}
