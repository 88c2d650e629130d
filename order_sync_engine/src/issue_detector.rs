//! Picks the single order, if any, whose rejected proof of payment the customer has to deal with.
//!
//! Both functions are pure: the same set (and exclusions) always gives the same answer.
use std::collections::HashMap;

use log::*;

use crate::{
    order_set::ActiveOrderSet,
    order_types::{Order, OrderId, PaymentProofIssue},
};

/// The order chosen to drive the payment-proof notification.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueSelection {
    order: Order,
    reason: PaymentProofIssue,
}

impl IssueSelection {
    fn from_order(order: &Order) -> Option<Self> {
        if !order.has_payment_issue() {
            return None;
        }
        let reason = order.payment_proof_issue.clone()?;
        Some(Self { order: order.clone(), reason })
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order.order_id
    }

    pub fn reason(&self) -> &PaymentProofIssue {
        &self.reason
    }

    pub fn order(&self) -> &Order {
        &self.order
    }
}

/// Returns the first order, in delivery order, that is Pending and carries a payment-proof issue.
pub fn detect(set: &ActiveOrderSet) -> Option<IssueSelection> {
    let selection = set.iter().find_map(IssueSelection::from_order);
    if let Some(s) = &selection {
        trace!("🔎️ Order {} needs attention: {}", s.order_id(), s.reason());
    }
    selection
}

/// Like [`detect`], but skips orders whose issue is listed in `excluded` with the same reason.
pub fn detect_excluding(set: &ActiveOrderSet, excluded: &HashMap<OrderId, PaymentProofIssue>) -> Option<IssueSelection> {
    set.iter()
        .filter_map(IssueSelection::from_order)
        .find(|s| excluded.get(s.order_id()) != Some(s.reason()))
}

/// Every order that currently qualifies, in delivery order.
pub fn qualifying(set: &ActiveOrderSet) -> impl Iterator<Item = IssueSelection> + '_ {
    set.iter().filter_map(IssueSelection::from_order)
}
