use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use log::*;

use super::lock;
use crate::{
    order_types::{OrderFilter, OrderRecord, SubjectId},
    subscription::Subscription,
    tracker::TrackerError,
    traits::{OrderStore, SnapshotSink},
};

struct Listener {
    filter: OrderFilter,
    sink: SnapshotSink,
}

#[derive(Default)]
struct StoreInner {
    /// In insertion order, which is the order snapshots list them in.
    records: Vec<OrderRecord>,
    listeners: HashMap<u64, Listener>,
    revoked: HashSet<SubjectId>,
    next_id: u64,
}

impl StoreInner {
    fn broadcast(&mut self) {
        let StoreInner { records, listeners, .. } = self;
        let records: &[OrderRecord] = records;
        listeners.retain(|_, listener| listener.sink.snapshot(matching(records, &listener.filter)));
    }
}

fn matching(records: &[OrderRecord], filter: &OrderFilter) -> Vec<OrderRecord> {
    records.iter().filter(|r| r.matches(filter)).cloned().collect()
}

#[derive(Clone, Default)]
pub struct MemoryOrderStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<OrderRecord>) -> Self {
        let store = Self::default();
        lock(&store.inner).records = records;
        store
    }

    pub fn records(&self) -> Vec<OrderRecord> {
        lock(&self.inner).records.clone()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner).listeners.len()
    }

    /// Inserts a record, or replaces the record with the same order id in place.
    pub fn upsert(&self, record: OrderRecord) {
        let mut inner = lock(&self.inner);
        let existing = record
            .order_id
            .as_ref()
            .and_then(|id| inner.records.iter().position(|r| r.order_id.as_ref() == Some(id)));
        match existing {
            Some(i) => inner.records[i] = record,
            None => inner.records.push(record),
        }
        inner.broadcast();
    }

    /// Removes the record with the given order id. Returns false if there was no such record.
    pub fn remove(&self, order_id: &str) -> bool {
        let mut inner = lock(&self.inner);
        let before = inner.records.len();
        inner.records.retain(|r| r.order_id.as_deref() != Some(order_id));
        let removed = inner.records.len() != before;
        if removed {
            inner.broadcast();
        }
        removed
    }

    /// Denies `subject` access to its orders. Open subscriptions for the subject fail, and so will new ones until
    /// access is restored.
    pub fn revoke_access(&self, subject: &SubjectId) {
        info!("📡️ [memory] Revoking order access for {subject}");
        let mut inner = lock(&self.inner);
        inner.revoked.insert(subject.clone());
        inner.listeners.retain(|_, listener| {
            if &listener.filter.owner_id == subject {
                let _ = listener.sink.fail(format!("permission denied for {subject}"));
                false
            } else {
                true
            }
        });
    }

    pub fn restore_access(&self, subject: &SubjectId) {
        info!("📡️ [memory] Restoring order access for {subject}");
        lock(&self.inner).revoked.remove(subject);
    }
}

impl OrderStore for MemoryOrderStore {
    fn subscribe(&self, filter: OrderFilter, sink: SnapshotSink) -> Result<Subscription, TrackerError> {
        let mut inner = lock(&self.inner);
        if inner.revoked.contains(&filter.owner_id) {
            return Err(TrackerError::SubscriptionFailed(format!("permission denied for {}", filter.owner_id)));
        }
        if !sink.snapshot(matching(&inner.records, &filter)) {
            return Err(TrackerError::SubscriptionFailed("the listener closed before it was registered".into()));
        }
        let id = inner.next_id;
        inner.next_id += 1;
        trace!("📡️ [memory] Listener {id} registered for {}", filter.owner_id);
        inner.listeners.insert(id, Listener { filter, sink });
        let weak = Arc::downgrade(&self.inner);
        Ok(Subscription::new(format!("memory-orders-{id}"), move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).listeners.remove(&id);
            }
        }))
    }
}
