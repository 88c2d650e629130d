//! The live order subscription for the current subject.
//!
//! At most one upstream subscription is open at a time. Opening a subscription for a new subject always releases the
//! previous one first. All subscriptions feed the same channel; every delivery is stamped with the subject and
//! generation of the subscription that produced it, and deliveries from anything but the open subscription are
//! discarded.
use log::*;
use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::{
    events::StreamEvent,
    order_types::{OrderFilter, SubjectId},
    subscription::Subscription,
    tracker::TrackerError,
    traits::{OrderStore, SnapshotSink},
};

struct OpenStream {
    subject: SubjectId,
    generation: u64,
    // Held for its Drop
    _subscription: Subscription,
}

pub struct OrderStreamSubscriber<S> {
    store: S,
    sender: mpsc::UnboundedSender<StreamEvent>,
    receiver: mpsc::UnboundedReceiver<StreamEvent>,
    open: Option<OpenStream>,
    generation: u64,
    stale_discarded: u64,
}

impl<S: OrderStore> OrderStreamSubscriber<S> {
    pub fn new(store: S) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { store, sender, receiver, open: None, generation: 0, stale_discarded: 0 }
    }

    /// The subject of the open subscription, if there is one.
    pub fn subject(&self) -> Option<&SubjectId> {
        self.open.as_ref().map(|o| &o.subject)
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// How many deliveries from replaced or failed subscriptions have been dropped.
    pub fn stale_discarded(&self) -> u64 {
        self.stale_discarded
    }

    /// Opens the subscription for `subject`, closing the current one first.
    pub fn open(&mut self, subject: &SubjectId) -> Result<(), TrackerError> {
        self.close();
        self.generation += 1;
        let sink = SnapshotSink::new(subject.clone(), self.generation, self.sender.clone());
        let filter = OrderFilter::active_orders_for(subject.clone());
        let subscription = self.store.subscribe(filter, sink).map_err(|e| {
            warn!("📡️ Could not subscribe to orders for {subject}. {e}");
            e
        })?;
        debug!("📡️ Subscribed to active orders for {subject} (generation {})", self.generation);
        self.open = Some(OpenStream { subject: subject.clone(), generation: self.generation, _subscription: subscription });
        Ok(())
    }

    /// Releases the open subscription, if any.
    pub fn close(&mut self) {
        if let Some(open) = self.open.take() {
            debug!("📡️ Closing order subscription for {} (generation {})", open.subject, open.generation);
        }
    }

    /// Waits for the next delivery from the open subscription. Deliveries from older subscriptions are skipped. Pends
    /// forever while no subscription is open.
    pub async fn next_event(&mut self) -> StreamEvent {
        loop {
            // We hold a sender ourselves, so the channel can never report closed.
            let Some(event) = self.receiver.recv().await else {
                return std::future::pending().await;
            };
            if let Some(event) = self.accept(event) {
                return event;
            }
        }
    }

    /// Takes the next current delivery that has already arrived, without waiting.
    pub fn try_next_event(&mut self) -> Option<StreamEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if let Some(event) = self.accept(event) {
                        return Some(event);
                    }
                },
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
            }
        }
    }

    fn accept(&mut self, event: StreamEvent) -> Option<StreamEvent> {
        let current = match &self.open {
            Some(open) => open.generation == event.generation() && &open.subject == event.subject(),
            None => false,
        };
        if !current {
            self.stale_discarded += 1;
            debug!(
                "📡️ Discarding {} for {} from a subscription that is no longer open (generation {})",
                event.kind(),
                event.subject(),
                event.generation()
            );
            return None;
        }
        if let StreamEvent::Failed { reason, .. } = &event {
            warn!("📡️ Order subscription for {} failed: {reason}", event.subject());
            // The subscription is finished. Anything it sends from now on is stale.
            self.close();
        }
        Some(event)
    }
}
