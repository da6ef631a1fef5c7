pub mod client;
pub mod models;

use std::future::Future;

use crate::error::AppResult;
use crate::history::Reading;

pub use client::SensorApiClient;

/// Anything that can produce the latest batch of readings.
///
/// The refresh loop is generic over this so it can be driven without a
/// live readings API.
pub trait ReadingSource: Send + Sync {
    fn fetch_latest(&self) -> impl Future<Output = AppResult<Vec<Reading>>> + Send;
}

impl<T: ReadingSource> ReadingSource for std::sync::Arc<T> {
    fn fetch_latest(&self) -> impl Future<Output = AppResult<Vec<Reading>>> + Send {
        (**self).fetch_latest()
    }
}
