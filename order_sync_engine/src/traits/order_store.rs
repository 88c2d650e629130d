use log::*;
use tokio::sync::mpsc;

use crate::{
    events::StreamEvent,
    order_types::{OrderFilter, OrderRecord, SubjectId},
    subscription::Subscription,
    tracker::TrackerError,
};

/// Where an [`OrderStore`] delivers the snapshots for one subscription.
///
/// Each sink is stamped with the subject and generation of the subscription it was created for, so that the consumer
/// can recognise deliveries from a subscription that has since been replaced.
#[derive(Clone, Debug)]
pub struct SnapshotSink {
    subject: SubjectId,
    generation: u64,
    sender: mpsc::UnboundedSender<StreamEvent>,
}

impl SnapshotSink {
    pub(crate) fn new(subject: SubjectId, generation: u64, sender: mpsc::UnboundedSender<StreamEvent>) -> Self {
        Self { subject, generation, sender }
    }

    pub fn subject(&self) -> &SubjectId {
        &self.subject
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Delivers the complete set of records currently matching the subscription's filter, in the store's natural
    /// order.
    pub fn snapshot(&self, records: Vec<OrderRecord>) -> bool {
        let event = StreamEvent::Snapshot { subject: self.subject.clone(), generation: self.generation, records };
        self.send(event)
    }

    /// Reports that the subscription has failed. No further snapshots from this sink will be used.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        let event = StreamEvent::Failed { subject: self.subject.clone(), generation: self.generation, reason: reason.into() };
        self.send(event)
    }

    fn send(&self, event: StreamEvent) -> bool {
        match self.sender.send(event) {
            Ok(()) => true,
            Err(_) => {
                trace!("📡️ Snapshot listener for {} has gone away", self.subject);
                false
            },
        }
    }
}

/// The upstream order store.
pub trait OrderStore {
    /// Opens a live query for the records matching `filter`.
    ///
    /// Implementations deliver a full snapshot to `sink` immediately and again after every change that affects the
    /// result. A failed subscription either returns an error here, or calls [`SnapshotSink::fail`] later. Releasing
    /// the returned handle stops deliveries.
    fn subscribe(&self, filter: OrderFilter, sink: SnapshotSink) -> Result<Subscription, TrackerError>;
}
