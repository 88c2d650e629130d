//! The active-order set and the reducer that owns it.
//!
//! The upstream store pushes a complete snapshot on every change, so the reducer never patches: each accepted
//! snapshot replaces the whole set. An order that leaves the active statuses simply stops appearing.
use std::collections::HashMap;

use log::*;

use crate::order_types::{MalformedRecord, Order, OrderId, OrderRecord, SubjectId};

/// The active orders of one subject, in the order the store delivered them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveOrderSet {
    orders: Vec<Order>,
    index: HashMap<OrderId, usize>,
}

impl ActiveOrderSet {
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.index.get(id).map(|&i| &self.orders[i])
    }

    pub fn contains(&self, id: &OrderId) -> bool {
        self.index.contains_key(id)
    }

    /// Orders in delivery order.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn ids(&self) -> Vec<OrderId> {
        self.orders.iter().map(|o| o.order_id.clone()).collect()
    }

    fn push(&mut self, order: Order) -> bool {
        if self.index.contains_key(&order.order_id) {
            return false;
        }
        self.index.insert(order.order_id.clone(), self.orders.len());
        self.orders.push(order);
        true
    }
}

impl<'a> IntoIterator for &'a ActiveOrderSet {
    type Item = &'a Order;
    type IntoIter = std::slice::Iter<'a, Order>;

    fn into_iter(self) -> Self::IntoIter {
        self.orders.iter()
    }
}

/// Why a snapshot was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotRejection {
    /// The snapshot belongs to a subject that is no longer current.
    IdentityRace { expected: Option<SubjectId>, received: SubjectId },
}

/// What happened to the records of an accepted snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub accepted: usize,
    pub malformed: Vec<MalformedRecord>,
    /// Records that parsed, but belong to someone else or are not active.
    pub filtered: usize,
    pub duplicates: usize,
}

/// Owns the [`ActiveOrderSet`] of one session. Nothing else mutates it.
#[derive(Debug, Default)]
pub struct OrderSetReducer {
    subject: Option<SubjectId>,
    set: ActiveOrderSet,
}

impl OrderSetReducer {
    pub fn subject(&self) -> Option<&SubjectId> {
        self.subject.as_ref()
    }

    pub fn active_orders(&self) -> &ActiveOrderSet {
        &self.set
    }

    /// Starts accepting snapshots for `subject`, discarding anything held for a previous subject.
    pub fn begin(&mut self, subject: SubjectId) {
        debug!("🧮️ Reducer now tracking orders for {subject}");
        self.subject = Some(subject);
        self.set = ActiveOrderSet::default();
    }

    /// Forgets the subject and empties the set.
    pub fn reset(&mut self) {
        if self.subject.is_some() || !self.set.is_empty() {
            debug!("🧮️ Reducer reset. {} orders discarded", self.set.len());
        }
        self.subject = None;
        self.set = ActiveOrderSet::default();
    }

    /// Empties the set but keeps the subject. Used when the stream fails and the last snapshot can no longer be
    /// trusted.
    pub fn clear(&mut self) {
        self.set = ActiveOrderSet::default();
    }

    /// Replaces the set with the active orders of `subject` found in `records`.
    ///
    /// Records that are malformed, belong to another subject or are not active are left out, as are repeated order
    /// ids (the first occurrence wins). Returns an error, and leaves the set untouched, if `subject` is not the
    /// subject this reducer is tracking.
    pub fn apply(&mut self, subject: &SubjectId, records: Vec<OrderRecord>) -> Result<SnapshotSummary, SnapshotRejection> {
        if self.subject.as_ref() != Some(subject) {
            return Err(SnapshotRejection::IdentityRace { expected: self.subject.clone(), received: subject.clone() });
        }
        let mut summary = SnapshotSummary::default();
        let mut set = ActiveOrderSet::default();
        for record in records {
            let order = match Order::try_from(record) {
                Ok(order) => order,
                Err(e) => {
                    warn!("🧮️ Dropping record from snapshot. {e}");
                    summary.malformed.push(e);
                    continue;
                },
            };
            if &order.owner_id != subject || !order.status.is_active() {
                trace!("🧮️ Ignoring order {} ({}, owner {})", order.order_id, order.status, order.owner_id);
                summary.filtered += 1;
                continue;
            }
            let id = order.order_id.clone();
            if set.push(order) {
                summary.accepted += 1;
            } else {
                warn!("🧮️ Order {id} appears more than once in the snapshot. Keeping the first copy");
                summary.duplicates += 1;
            }
        }
        debug!("🧮️ Snapshot applied for {subject}. {} active orders", set.len());
        self.set = set;
        Ok(summary)
    }
}
