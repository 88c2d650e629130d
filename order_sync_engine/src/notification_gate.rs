//! The at-most-one payment-proof notification.
//!
//! The gate is `Closed` until the active set contains an order with a rejected proof of payment that the customer
//! has not dismissed yet. While `Open`, it carries the selected issue for the presentation layer to show. A dismissal
//! applies to the displayed issue only, and lasts only as long as it keeps qualifying unchanged: if the issue clears
//! and comes back, or changes reason, it is shown again. Other orders with issues are shown as soon as they are
//! selected.
use std::collections::HashMap;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    issue_detector::{detect_excluding, qualifying, IssueSelection},
    order_set::ActiveOrderSet,
    order_types::{OrderId, PaymentProofIssue},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateStatus {
    Closed,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateCloseReason {
    /// The customer dismissed the notification.
    Acknowledged,
    /// The store cleared the issue, or the order is no longer pending.
    Resolved,
    SignedOut,
    StreamUnavailable,
}

/// Read-only view of the gate for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationGateState {
    pub open: bool,
    pub issue: Option<IssueSelection>,
}

impl NotificationGateState {
    pub fn closed() -> Self {
        Self { open: false, issue: None }
    }

    pub fn status(&self) -> GateStatus {
        if self.open {
            GateStatus::Open
        } else {
            GateStatus::Closed
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateTransition {
    Unchanged,
    Opened(IssueSelection),
    /// A different order took over the notification while it was open.
    Rearmed { previous: OrderId, selection: IssueSelection },
    /// Same order, but its details changed.
    Refreshed(IssueSelection),
    Closed { order_id: OrderId, reason: GateCloseReason },
}

impl GateTransition {
    pub fn is_change(&self) -> bool {
        !matches!(self, GateTransition::Unchanged)
    }
}

#[derive(Debug, Default)]
pub struct NotificationGate {
    /// `Some` exactly when the gate is open.
    issue: Option<IssueSelection>,
    acknowledged: HashMap<OrderId, PaymentProofIssue>,
}

impl NotificationGate {
    pub fn status(&self) -> GateStatus {
        if self.issue.is_some() {
            GateStatus::Open
        } else {
            GateStatus::Closed
        }
    }

    pub fn state(&self) -> NotificationGateState {
        NotificationGateState { open: self.issue.is_some(), issue: self.issue.clone() }
    }

    pub fn is_acknowledged(&self, id: &OrderId) -> bool {
        self.acknowledged.contains_key(id)
    }

    /// Re-evaluates the gate against a freshly reduced set.
    pub fn update(&mut self, set: &ActiveOrderSet) -> GateTransition {
        let current: HashMap<OrderId, PaymentProofIssue> =
            qualifying(set).map(|s| (s.order_id().clone(), s.reason().clone())).collect();
        self.acknowledged.retain(|id, reason| current.get(id) == Some(reason));
        let selection = detect_excluding(set, &self.acknowledged);
        let transition = match (self.issue.take(), selection) {
            (None, None) => GateTransition::Unchanged,
            (Some(previous), None) => {
                GateTransition::Closed { order_id: previous.order_id().clone(), reason: GateCloseReason::Resolved }
            },
            (None, Some(selection)) => {
                self.issue = Some(selection.clone());
                GateTransition::Opened(selection)
            },
            (Some(previous), Some(selection)) if previous.order_id() == selection.order_id() => {
                self.issue = Some(selection.clone());
                if previous == selection {
                    GateTransition::Unchanged
                } else {
                    GateTransition::Refreshed(selection)
                }
            },
            (Some(previous), Some(selection)) => {
                self.issue = Some(selection.clone());
                GateTransition::Rearmed { previous: previous.order_id().clone(), selection }
            },
        };
        log_transition(&transition);
        transition
    }

    /// The customer dismissed the notification. The displayed issue stays dismissed until it changes.
    pub fn acknowledge(&mut self) -> GateTransition {
        let Some(issue) = self.issue.take() else {
            trace!("🚦️ Acknowledge ignored, the gate is already closed");
            return GateTransition::Unchanged;
        };
        self.acknowledged.insert(issue.order_id().clone(), issue.reason().clone());
        let transition =
            GateTransition::Closed { order_id: issue.order_id().clone(), reason: GateCloseReason::Acknowledged };
        log_transition(&transition);
        transition
    }

    /// Closes the gate because the data behind it can no longer be trusted. Dismissals are kept, since the session is
    /// the same.
    pub fn suspend(&mut self) -> GateTransition {
        self.close_with(GateCloseReason::StreamUnavailable)
    }

    /// Closes the gate and forgets everything about the session.
    pub fn reset(&mut self) -> GateTransition {
        self.acknowledged.clear();
        self.close_with(GateCloseReason::SignedOut)
    }

    fn close_with(&mut self, reason: GateCloseReason) -> GateTransition {
        let transition = match self.issue.take() {
            Some(issue) => GateTransition::Closed { order_id: issue.order_id().clone(), reason },
            None => GateTransition::Unchanged,
        };
        log_transition(&transition);
        transition
    }
}

fn log_transition(transition: &GateTransition) {
    match transition {
        GateTransition::Unchanged => {},
        GateTransition::Opened(s) => debug!("🚦️ Gate opened for order {}: {}", s.order_id(), s.reason()),
        GateTransition::Rearmed { previous, selection } => {
            debug!("🚦️ Gate moved from order {previous} to {}: {}", selection.order_id(), selection.reason())
        },
        GateTransition::Refreshed(s) => debug!("🚦️ Gate refreshed for order {}", s.order_id()),
        GateTransition::Closed { order_id, reason } => debug!("🚦️ Gate closed for order {order_id} ({reason:?})"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        order_set::OrderSetReducer,
        order_types::{OrderRecord, OrderStatusType::*, SubjectId},
    };

    const INVALID: &str = "Invalid Proof of Payment";
    const INSUFFICIENT: &str = "Insufficient Payment Amount";

    fn set_of(records: Vec<OrderRecord>) -> ActiveOrderSet {
        let mut reducer = OrderSetReducer::default();
        reducer.begin(SubjectId::from("u1"));
        reducer.apply(&SubjectId::from("u1"), records).unwrap();
        reducer.active_orders().clone()
    }

    fn opened_for(t: &GateTransition) -> Option<&str> {
        match t {
            GateTransition::Opened(s) => Some(s.order_id().as_str()),
            _ => None,
        }
    }

    #[test]
    fn starts_closed() {
        let gate = NotificationGate::default();
        assert_eq!(gate.status(), GateStatus::Closed);
        assert_eq!(gate.state(), NotificationGateState::closed());
    }

    #[test]
    fn opens_then_closes_when_resolved() {
        let mut gate = NotificationGate::default();
        let t = gate.update(&set_of(vec![OrderRecord::new("o1", "u1", Pending).with_issue(INVALID)]));
        assert_eq!(opened_for(&t), Some("o1"));
        let state = gate.state();
        assert!(state.open);
        assert_eq!(state.issue.unwrap().order_id(), &OrderId::from("o1"));

        let t = gate.update(&set_of(vec![OrderRecord::new("o1", "u1", Confirmed)]));
        assert_eq!(t, GateTransition::Closed { order_id: "o1".into(), reason: GateCloseReason::Resolved });
        assert_eq!(gate.status(), GateStatus::Closed);
    }

    #[test]
    fn acknowledged_issue_stays_closed_until_another_order_qualifies() {
        let mut gate = NotificationGate::default();
        let o1 = OrderRecord::new("o1", "u1", Pending).with_issue(INVALID);
        gate.update(&set_of(vec![o1.clone()]));
        let t = gate.acknowledge();
        assert_eq!(t, GateTransition::Closed { order_id: "o1".into(), reason: GateCloseReason::Acknowledged });
        assert!(gate.is_acknowledged(&OrderId::from("o1")));

        for _ in 0..3 {
            assert_eq!(gate.update(&set_of(vec![o1.clone()])), GateTransition::Unchanged);
            assert_eq!(gate.status(), GateStatus::Closed);
        }

        let o2 = OrderRecord::new("o2", "u1", Pending).with_issue(INSUFFICIENT);
        let t = gate.update(&set_of(vec![o1, o2]));
        assert_eq!(opened_for(&t), Some("o2"));
    }

    #[test]
    fn acknowledge_dismisses_only_the_displayed_issue() {
        let mut gate = NotificationGate::default();
        let records = vec![
            OrderRecord::new("o1", "u1", Pending).with_issue(INVALID),
            OrderRecord::new("o2", "u1", Pending).with_issue(INSUFFICIENT),
        ];
        gate.update(&set_of(records.clone()));
        gate.acknowledge();
        assert!(gate.is_acknowledged(&OrderId::from("o1")));
        assert!(!gate.is_acknowledged(&OrderId::from("o2")));
        let t = gate.update(&set_of(records));
        assert_eq!(opened_for(&t), Some("o2"));
    }

    #[test]
    fn unseen_issue_opens_once_the_displayed_one_resolves() {
        let mut gate = NotificationGate::default();
        gate.update(&set_of(vec![
            OrderRecord::new("o1", "u1", Pending).with_issue(INVALID),
            OrderRecord::new("o2", "u1", Pending).with_issue(INSUFFICIENT),
        ]));
        gate.acknowledge();
        let t = gate.update(&set_of(vec![
            OrderRecord::new("o1", "u1", Confirmed),
            OrderRecord::new("o2", "u1", Pending).with_issue(INSUFFICIENT),
        ]));
        assert_eq!(opened_for(&t), Some("o2"));
        assert_eq!(gate.status(), GateStatus::Open);
        assert!(!gate.is_acknowledged(&OrderId::from("o1")));
    }

    #[test]
    fn recurring_or_changed_issues_reopen() {
        let mut gate = NotificationGate::default();
        gate.update(&set_of(vec![OrderRecord::new("o1", "u1", Pending).with_issue(INVALID)]));
        gate.acknowledge();
        // The reason changes
        let t = gate.update(&set_of(vec![OrderRecord::new("o1", "u1", Pending).with_issue(INSUFFICIENT)]));
        assert_eq!(opened_for(&t), Some("o1"));
        gate.acknowledge();
        // The issue clears, then comes back
        gate.update(&set_of(vec![OrderRecord::new("o1", "u1", Pending)]));
        assert!(!gate.is_acknowledged(&OrderId::from("o1")));
        let t = gate.update(&set_of(vec![OrderRecord::new("o1", "u1", Pending).with_issue(INSUFFICIENT)]));
        assert_eq!(opened_for(&t), Some("o1"));
    }

    #[test]
    fn rearms_in_place_when_the_selection_changes() {
        let mut gate = NotificationGate::default();
        gate.update(&set_of(vec![OrderRecord::new("o1", "u1", Pending).with_issue(INVALID)]));
        let t = gate.update(&set_of(vec![
            OrderRecord::new("o1", "u1", Confirmed),
            OrderRecord::new("o2", "u1", Pending).with_issue(INSUFFICIENT),
        ]));
        match t {
            GateTransition::Rearmed { previous, selection } => {
                assert_eq!(previous, OrderId::from("o1"));
                assert_eq!(selection.order_id(), &OrderId::from("o2"));
            },
            other => panic!("expected a re-arm, got {other:?}"),
        }
        assert_eq!(gate.status(), GateStatus::Open);
    }

    #[test]
    fn refreshes_when_the_same_order_changes() {
        let mut gate = NotificationGate::default();
        gate.update(&set_of(vec![OrderRecord::new("o1", "u1", Pending).with_issue(INVALID)]));
        let t = gate.update(&set_of(vec![OrderRecord::new("o1", "u1", Pending)
            .with_issue(INVALID)
            .with_payment_method("GCash")]));
        assert!(matches!(t, GateTransition::Refreshed(_)));
        let t = gate.update(&set_of(vec![OrderRecord::new("o1", "u1", Pending)
            .with_issue(INVALID)
            .with_payment_method("GCash")]));
        assert_eq!(t, GateTransition::Unchanged);
    }

    #[test]
    fn reset_closes_and_forgets() {
        let mut gate = NotificationGate::default();
        let o1 = OrderRecord::new("o1", "u1", Pending).with_issue(INVALID);
        gate.update(&set_of(vec![o1.clone()]));
        gate.acknowledge();
        assert_eq!(gate.reset(), GateTransition::Unchanged);
        assert!(!gate.is_acknowledged(&OrderId::from("o1")));
        gate.update(&set_of(vec![o1]));
        let t = gate.reset();
        assert_eq!(t, GateTransition::Closed { order_id: "o1".into(), reason: GateCloseReason::SignedOut });
    }

    #[test]
    fn suspend_keeps_dismissals() {
        let mut gate = NotificationGate::default();
        let o1 = OrderRecord::new("o1", "u1", Pending).with_issue(INVALID);
        let o2 = OrderRecord::new("o2", "u1", Pending).with_issue(INSUFFICIENT);
        gate.update(&set_of(vec![o1.clone()]));
        gate.acknowledge();
        gate.update(&set_of(vec![o1.clone(), o2]));
        let t = gate.suspend();
        assert_eq!(t, GateTransition::Closed { order_id: "o2".into(), reason: GateCloseReason::StreamUnavailable });
        assert!(gate.is_acknowledged(&OrderId::from("o1")));
        assert_eq!(gate.update(&set_of(vec![o1])), GateTransition::Unchanged);
    }

    #[test]
    fn acknowledging_a_closed_gate_does_nothing() {
        let mut gate = NotificationGate::default();
        assert_eq!(gate.acknowledge(), GateTransition::Unchanged);
    }
}
