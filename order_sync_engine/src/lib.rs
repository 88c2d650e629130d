//! Order Sync Engine
//!
//! Keeps a customer's list of in-progress orders up to date from a live order store, and decides when the customer
//! must be stopped with a notice about a rejected proof of payment.
//!
//! The engine is built from small parts that each do one thing:
//! 1. The session watcher ([`session_watcher`]) follows sign-ins and sign-outs reported by an [`IdentityProvider`].
//! 2. The order stream subscriber ([`order_stream`]) keeps exactly one live subscription to the [`OrderStore`] open
//!    for whoever is signed in, and drops deliveries from subscriptions it has already replaced.
//! 3. The order set reducer ([`order_set`]) replaces the active order set wholesale with each snapshot.
//! 4. The issue detector ([`issue_detector`]) picks at most one order with a payment-proof problem.
//! 5. The notification gate ([`notification_gate`]) decides whether that problem is shown, and remembers dismissals
//!    for the rest of the session.
//!
//! [`TrackerState`] composes these into a synchronous state machine, and [`OrderTracker`] runs it on a tokio task,
//! publishing a [`TrackerView`] for the presentation layer. Hooks can be registered to be told about gate and stream
//! changes as they happen (see [`mod@events`]).
//!
//! The [`memory`] module has in-memory collaborators that honour the same contracts as the real services.
pub mod events;
pub mod issue_detector;
pub mod memory;
pub mod notification_gate;
pub mod order_set;
pub mod order_stream;
pub mod order_types;
pub mod session_watcher;
mod subscription;
mod tracker;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use issue_detector::{detect, IssueSelection};
pub use notification_gate::{GateCloseReason, GateStatus, GateTransition, NotificationGateState};
pub use order_set::ActiveOrderSet;
pub use subscription::Subscription;
pub use tracker::{OrderTracker, StreamStatus, TrackerConfig, TrackerError, TrackerHandle, TrackerState, TrackerView};
pub use traits::{IdentityProvider, IdentitySink, OrderStore, SnapshotSink};
