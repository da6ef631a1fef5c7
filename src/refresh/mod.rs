pub mod scheduler;
pub mod worker;

pub use worker::{LoopState, RefreshLoop, TickOutcome, FETCH_ERROR_MESSAGE};
