use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use order_sync_common::{OrderId, SubjectId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {kind}: {value}")]
pub struct ConversionError {
    kind: &'static str,
    value: String,
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been placed and is waiting for the store to review the payment.
    Pending,
    /// The store has accepted the order and its payment.
    Confirmed,
    /// The order is being prepared.
    Prepared,
    /// The order is out for delivery.
    Delivery,
    /// The order has been delivered.
    Completed,
    /// The order was cancelled by the customer or the store.
    Cancelled,
}

/// The statuses an order can be in while the customer is still waiting on it.
pub const ACTIVE_STATUSES: [OrderStatusType; 4] =
    [OrderStatusType::Pending, OrderStatusType::Confirmed, OrderStatusType::Prepared, OrderStatusType::Delivery];

impl OrderStatusType {
    pub fn is_active(&self) -> bool {
        ACTIVE_STATUSES.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatusType::Pending => "Pending",
            OrderStatusType::Confirmed => "Confirmed",
            OrderStatusType::Prepared => "Prepared",
            OrderStatusType::Delivery => "Delivery",
            OrderStatusType::Completed => "Completed",
            OrderStatusType::Cancelled => "Cancelled",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Confirmed" => Ok(Self::Confirmed),
            "Prepared" => Ok(Self::Prepared),
            "Delivery" => Ok(Self::Delivery),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError { kind: "order status", value: s.to_string() }),
        }
    }
}

//--------------------------------------  PaymentProofIssue    ---------------------------------------------------------
/// The reason a submitted proof of payment was rejected by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PaymentProofIssue {
    InsufficientPaymentAmount,
    InvalidProofOfPayment,
    /// A tag the store uses that this crate does not know about. It still counts as an issue.
    Other(String),
}

impl PaymentProofIssue {
    /// Interprets a raw issue tag. Blank tags mean "no issue".
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim() {
            "" => None,
            "Insufficient Payment Amount" => Some(Self::InsufficientPaymentAmount),
            "Invalid Proof of Payment" => Some(Self::InvalidProofOfPayment),
            other => Some(Self::Other(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PaymentProofIssue::InsufficientPaymentAmount => "Insufficient Payment Amount",
            PaymentProofIssue::InvalidProofOfPayment => "Invalid Proof of Payment",
            PaymentProofIssue::Other(s) => s.as_str(),
        }
    }
}

impl Display for PaymentProofIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//--------------------------------------      OrderRecord      ---------------------------------------------------------
/// An order exactly as the upstream store delivers it. Every field is optional because the store does not enforce
/// its schema; [`Order::try_from`] decides whether the record is usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, rename = "orderUserId", skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, rename = "orderStatus", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, rename = "proofOfPaymentIssue", skip_serializing_if = "Option::is_none")]
    pub payment_proof_issue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_date: Option<DateTime<Utc>>,
    #[serde(default, rename = "orderTotalCost", skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<serde_json::Value>,
    #[serde(default, rename = "orderPayment", skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

impl OrderRecord {
    pub fn new(order_id: &str, owner_id: &str, status: OrderStatusType) -> Self {
        Self {
            order_id: Some(order_id.to_string()),
            owner_id: Some(owner_id.to_string()),
            status: Some(status.to_string()),
            ..Default::default()
        }
    }

    pub fn with_issue(mut self, issue: &str) -> Self {
        self.payment_proof_issue = Some(issue.to_string());
        self
    }

    pub fn with_payment_method(mut self, method: &str) -> Self {
        self.payment_method = Some(method.to_string());
        self
    }

    pub fn with_total_cost(mut self, total: f64) -> Self {
        self.total_cost = serde_json::Number::from_f64(total).map(serde_json::Value::Number);
        self
    }

    pub fn with_order_date(mut self, date: DateTime<Utc>) -> Self {
        self.order_date = Some(date);
        self
    }

    /// Evaluates the subscription filter on the raw fields, the same way the store's query does.
    pub fn matches(&self, filter: &OrderFilter) -> bool {
        let owner_matches = self.owner_id.as_deref() == Some(filter.owner_id.as_str());
        let status_matches = self
            .status
            .as_deref()
            .map(|s| filter.status_in.iter().any(|status| status.as_str() == s))
            .unwrap_or(false);
        owner_matches && status_matches
    }
}

//--------------------------------------   MalformedRecord     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed order record {}: {reason}", .order_id.as_deref().unwrap_or("<no id>"))]
pub struct MalformedRecord {
    pub order_id: Option<String>,
    pub reason: String,
}

//--------------------------------------         Order         ---------------------------------------------------------
/// A validated order. The date, cost and payment method are carried for display only.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub order_id: OrderId,
    pub owner_id: SubjectId,
    pub status: OrderStatusType,
    pub payment_proof_issue: Option<PaymentProofIssue>,
    pub order_date: Option<DateTime<Utc>>,
    pub total_cost: Option<f64>,
    pub payment_method: Option<String>,
}

impl Order {
    /// True if the customer must act on a rejected proof of payment for this order.
    pub fn has_payment_issue(&self) -> bool {
        self.status == OrderStatusType::Pending && self.payment_proof_issue.is_some()
    }
}

fn required(value: Option<String>, field: &str, order_id: &Option<String>) -> Result<String, MalformedRecord> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MalformedRecord { order_id: order_id.clone(), reason: format!("{field} is missing") }),
    }
}

fn total_cost_from_value(value: Option<serde_json::Value>) -> Option<f64> {
    match value? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

impl TryFrom<OrderRecord> for Order {
    type Error = MalformedRecord;

    fn try_from(record: OrderRecord) -> Result<Self, Self::Error> {
        let raw_id = record.order_id.clone();
        let order_id = OrderId(required(record.order_id, "orderId", &raw_id)?);
        let owner_id = SubjectId(required(record.owner_id, "orderUserId", &raw_id)?);
        let status = required(record.status, "orderStatus", &raw_id)?
            .parse::<OrderStatusType>()
            .map_err(|e| MalformedRecord { order_id: raw_id.clone(), reason: e.to_string() })?;
        let payment_proof_issue = record.payment_proof_issue.as_deref().and_then(PaymentProofIssue::from_tag);
        Ok(Self {
            order_id,
            owner_id,
            status,
            payment_proof_issue,
            order_date: record.order_date,
            total_cost: total_cost_from_value(record.total_cost),
            payment_method: record.payment_method,
        })
    }
}

//--------------------------------------      OrderFilter      ---------------------------------------------------------
/// The query an [`crate::traits::OrderStore`] subscription is opened with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFilter {
    pub owner_id: SubjectId,
    pub status_in: Vec<OrderStatusType>,
}

impl OrderFilter {
    /// The active orders belonging to `owner_id`.
    pub fn active_orders_for(owner_id: SubjectId) -> Self {
        Self { owner_id, status_in: ACTIVE_STATUSES.to_vec() }
    }
}
