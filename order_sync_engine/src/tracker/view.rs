use std::fmt::Display;

use crate::{notification_gate::NotificationGateState, order_set::ActiveOrderSet, order_types::SubjectId};

/// The health of the order subscription, for the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StreamStatus {
    /// Nobody is signed in.
    #[default]
    Idle,
    /// Subscribed, but the first snapshot has not arrived yet.
    Connecting,
    Live,
    /// The subscription failed. The order list is empty and may be stale; it stays that way until a reconnect.
    Unavailable(String),
}

impl Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamStatus::Idle => write!(f, "Idle"),
            StreamStatus::Connecting => write!(f, "Connecting"),
            StreamStatus::Live => write!(f, "Live"),
            StreamStatus::Unavailable(reason) => write!(f, "Unavailable ({reason})"),
        }
    }
}

/// Everything the presentation layer needs to render the orders page.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerView {
    pub subject: Option<SubjectId>,
    pub orders: ActiveOrderSet,
    pub gate: NotificationGateState,
    pub stream: StreamStatus,
}

impl Default for TrackerView {
    fn default() -> Self {
        Self {
            subject: None,
            orders: ActiveOrderSet::default(),
            gate: NotificationGateState::closed(),
            stream: StreamStatus::Idle,
        }
    }
}
