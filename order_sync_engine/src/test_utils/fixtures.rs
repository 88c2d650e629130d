use std::time::Duration;

use tokio::sync::watch;

use crate::{
    order_types::{OrderRecord, OrderStatusType},
    tracker::TrackerView,
};

pub const INVALID_PROOF: &str = "Invalid Proof of Payment";
pub const INSUFFICIENT_PAYMENT: &str = "Insufficient Payment Amount";

const VIEW_TIMEOUT: Duration = Duration::from_secs(5);

pub fn active_order(id: &str, owner: &str, status: OrderStatusType) -> OrderRecord {
    OrderRecord::new(id, owner, status).with_payment_method("GCash").with_total_cost(499.0)
}

pub fn pending_with_issue(id: &str, owner: &str, issue: &str) -> OrderRecord {
    active_order(id, owner, OrderStatusType::Pending).with_issue(issue)
}

/// Waits until the tracker publishes a view satisfying `predicate`, and returns it. Panics after a few seconds, so a
/// test that would otherwise hang fails instead.
pub async fn wait_for_view<F>(view: &mut watch::Receiver<TrackerView>, predicate: F) -> TrackerView
where F: FnMut(&TrackerView) -> bool {
    let found = match tokio::time::timeout(VIEW_TIMEOUT, view.wait_for(predicate)).await {
        Ok(Ok(found)) => Some(found.clone()),
        Ok(Err(_)) => panic!("The tracker stopped before the expected view was published"),
        Err(_) => None,
    };
    found.unwrap_or_else(|| panic!("Timed out waiting for the expected view. Last view: {:?}", *view.borrow()))
}
