//! Render contract handed to the presentation layer.
//!
//! The refresh loop never draws anything itself. It builds [`SensorView`]s
//! from the history store and passes them to a [`Renderer`]; the
//! dashboard page is fed by the [`RenderHub`] implementation.

pub mod hub;
pub mod views;

pub use hub::RenderHub;
pub use views::{RenderPass, RenderReason, SensorView, SeriesPoint};

/// Presentation collaborator of the refresh loop.
pub trait Renderer: Send + Sync {
    /// Publish views for the given sensors and return the resulting pass.
    fn render(&self, reason: RenderReason, sensors: Vec<SensorView>) -> RenderPass;

    /// Raise the user-visible error indication.
    fn show_error(&self, message: &str);

    /// Drop the error indication, if one is shown.
    fn clear_error(&self);
}
