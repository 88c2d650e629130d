use std::fmt::Write;

use anyhow::Result;
use order_sync_engine::{
    events::{GateChangedEvent, StreamStatusEvent, TrackerNotice},
    order_set::SnapshotSummary,
    ActiveOrderSet,
    GateTransition,
    IssueSelection,
    NotificationGateState,
    TrackerView,
};
use prettytable::{
    format::{LinePosition, LineSeparator, TableFormat},
    row,
    Table,
};

fn markdown_format() -> TableFormat {
    prettytable::format::FormatBuilder::new()
        .column_separator('|')
        .borders('|')
        .separator(LinePosition::Title, LineSeparator::new('-', '|', '|', '|'))
        .padding(1, 1)
        .build()
}

fn markdown_style(table: &mut Table) {
    table.set_format(markdown_format());
}

pub fn format_orders(orders: &ActiveOrderSet) -> String {
    if orders.is_empty() {
        return "No active orders".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row!["Order id", "Customer id", "Status", "Payment issue", "Total", "Payment", "Ordered"]);
    orders.iter().for_each(|order| {
        table.add_row(row![
            order.order_id,
            order.owner_id,
            order.status,
            order.payment_proof_issue.as_ref().map(|i| i.to_string()).unwrap_or_default(),
            order.total_cost.map(|c| format!("{c:.2}")).unwrap_or_default(),
            order.payment_method.as_deref().unwrap_or_default(),
            order.order_date.map(|d| d.to_string()).unwrap_or_default()
        ]);
    });
    markdown_style(&mut table);
    format!("{table}")
}

pub fn format_selection(selection: &IssueSelection) -> String {
    format!("Order {} needs a new proof of payment: {}", selection.order_id(), selection.reason())
}

pub fn format_gate(gate: &NotificationGateState) -> String {
    match &gate.issue {
        Some(selection) if gate.open => format!("Notification OPEN. {}", format_selection(selection)),
        _ => "Notification closed".to_string(),
    }
}

pub fn format_view(view: &TrackerView) -> Result<String> {
    let mut f = String::new();
    let subject = view.subject.as_ref().map(|s| s.to_string()).unwrap_or_else(|| "nobody".to_string());
    writeln!(f, "Signed in: {subject:20} Stream: {}", view.stream)?;
    writeln!(f, "{}", format_orders(&view.orders))?;
    write!(f, "{}", format_gate(&view.gate))?;
    Ok(f)
}

pub fn format_transition(transition: &GateTransition) -> String {
    match transition {
        GateTransition::Unchanged => "unchanged".to_string(),
        GateTransition::Opened(selection) => format!("opened for {}", selection.order_id()),
        GateTransition::Rearmed { previous, selection } => {
            format!("moved from {previous} to {}", selection.order_id())
        },
        GateTransition::Refreshed(selection) => format!("refreshed for {}", selection.order_id()),
        GateTransition::Closed { order_id, reason } => format!("closed for {order_id} ({reason:?})"),
    }
}

pub fn format_notice(notice: &TrackerNotice) -> String {
    match notice {
        TrackerNotice::GateChanged(GateChangedEvent { transition, .. }) => {
            format!("  * gate {}", format_transition(transition))
        },
        TrackerNotice::StreamStatusChanged(StreamStatusEvent { old_status, new_status, .. }) => {
            format!("  * stream {old_status} -> {new_status}")
        },
    }
}

pub fn format_summary(summary: &SnapshotSummary) -> Result<String> {
    let mut f = String::new();
    writeln!(
        f,
        "{accepted} active, {filtered} filtered out, {duplicates} duplicates, {malformed} malformed",
        accepted = summary.accepted,
        filtered = summary.filtered,
        duplicates = summary.duplicates,
        malformed = summary.malformed.len()
    )?;
    for record in &summary.malformed {
        writeln!(f, "  - {record}")?;
    }
    Ok(f)
}
