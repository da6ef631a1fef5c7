use chrono::Utc;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

use crate::render::{RenderPass, RenderReason, Renderer, SensorView};

/// Buffered passes per subscriber before a slow browser starts lagging
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug)]
struct HubState {
    generation: u64,
    last_reason: RenderReason,
    /// Latest view of every sensor ever rendered, in first-rendered order
    sensors: Vec<SensorView>,
    error: Option<String>,
}

/// Fan-out point between the refresh loop and connected dashboards.
///
/// Every pass is broadcast to live subscribers, and the latest view of
/// each sensor is retained so late joiners get a full picture.
#[derive(Debug)]
pub struct RenderHub {
    tx: broadcast::Sender<RenderPass>,
    state: Mutex<HubState>,
}

impl RenderHub {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            state: Mutex::new(HubState {
                generation: 0,
                last_reason: RenderReason::Poll,
                sensors: Vec::new(),
                error: None,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RenderPass> {
        self.tx.subscribe()
    }

    /// Full picture: every sensor's latest view plus the error state.
    #[must_use]
    pub fn current(&self) -> RenderPass {
        let state = self.lock();
        RenderPass {
            generation: state.generation,
            reason: state.last_reason,
            rendered_at: Utc::now(),
            sensors: state.sensors.clone(),
            error: state.error.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, pass: &RenderPass) {
        // No subscribers is fine; the pass is still retained for `current()`
        let receivers = self.tx.send(pass.clone()).unwrap_or(0);
        tracing::trace!(
            generation = pass.generation,
            reason = ?pass.reason,
            receivers,
            "render_pass_published"
        );
    }
}

impl Default for RenderHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for RenderHub {
    fn render(&self, reason: RenderReason, sensors: Vec<SensorView>) -> RenderPass {
        let pass = {
            let mut state = self.lock();
            state.generation += 1;
            state.last_reason = reason;

            for view in &sensors {
                match state.sensors.iter_mut().find(|v| v.sensor_id == view.sensor_id) {
                    Some(existing) => *existing = view.clone(),
                    None => state.sensors.push(view.clone()),
                }
            }

            RenderPass {
                generation: state.generation,
                reason,
                rendered_at: Utc::now(),
                sensors,
                error: state.error.clone(),
            }
        };

        self.publish(&pass);
        pass
    }

    fn show_error(&self, message: &str) {
        let pass = {
            let mut state = self.lock();
            if state.error.as_deref() == Some(message) {
                return;
            }
            state.error = Some(message.to_string());
            state.generation += 1;
            state.last_reason = RenderReason::Error;

            RenderPass {
                generation: state.generation,
                reason: RenderReason::Error,
                rendered_at: Utc::now(),
                sensors: Vec::new(),
                error: state.error.clone(),
            }
        };

        self.publish(&pass);
    }

    fn clear_error(&self) {
        self.lock().error = None;
    }
}
