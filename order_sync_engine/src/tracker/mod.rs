//! The order tracker: one session's worth of orders-page state, and the task that keeps it current.
mod config;
mod errors;
mod order_tracker;
mod state;
mod view;

pub use config::TrackerConfig;
pub use errors::TrackerError;
pub use order_tracker::{OrderTracker, TrackerHandle};
pub use state::TrackerState;
pub use view::{StreamStatus, TrackerView};
