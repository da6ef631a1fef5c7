//! Bounded in-memory history of sensor readings.

pub mod reading;
pub mod store;

pub use reading::Reading;
pub use store::HistoryStore;

use std::sync::Arc;
use tokio::sync::RwLock;

/// History store shared between the refresh loop and the HTTP handlers.
pub type SharedHistory = Arc<RwLock<HistoryStore>>;

#[must_use]
pub fn shared(capacity: usize) -> SharedHistory {
    Arc::new(RwLock::new(HistoryStore::new(capacity)))
}
