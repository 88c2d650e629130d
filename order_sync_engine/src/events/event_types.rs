use crate::{
    notification_gate::GateTransition,
    order_types::{OrderRecord, SubjectId},
    tracker::StreamStatus,
};

/// A delivery from an order subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The complete set of matching records, in the store's order.
    Snapshot { subject: SubjectId, generation: u64, records: Vec<OrderRecord> },
    /// The subscription has ended and will deliver nothing more.
    Failed { subject: SubjectId, generation: u64, reason: String },
}

impl StreamEvent {
    pub fn subject(&self) -> &SubjectId {
        match self {
            StreamEvent::Snapshot { subject, .. } | StreamEvent::Failed { subject, .. } => subject,
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            StreamEvent::Snapshot { generation, .. } | StreamEvent::Failed { generation, .. } => *generation,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Snapshot { .. } => "snapshot",
            StreamEvent::Failed { .. } => "failure",
        }
    }
}

/// Emitted whenever the notification gate changes.
#[derive(Debug, Clone, PartialEq)]
pub struct GateChangedEvent {
    pub subject: Option<SubjectId>,
    pub transition: GateTransition,
}

impl GateChangedEvent {
    pub fn new(subject: Option<SubjectId>, transition: GateTransition) -> Self {
        Self { subject, transition }
    }
}

/// Emitted whenever the order stream status changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamStatusEvent {
    pub subject: Option<SubjectId>,
    pub old_status: StreamStatus,
    pub new_status: StreamStatus,
}

/// Something the tracker wants its hooks to hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerNotice {
    GateChanged(GateChangedEvent),
    StreamStatusChanged(StreamStatusEvent),
}
