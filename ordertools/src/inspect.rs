use std::{fmt::Write, fs, path::Path};

use anyhow::{Context, Result};
use log::*;
use order_sync_engine::{
    detect,
    order_set::OrderSetReducer,
    order_types::{OrderRecord, SubjectId},
};

use crate::formatting::{format_orders, format_selection, format_summary};

pub fn load_snapshot(path: &Path) -> Result<Vec<OrderRecord>> {
    let data = fs::read_to_string(path).with_context(|| format!("Could not read snapshot file {}", path.display()))?;
    let records = serde_json::from_str(&data).with_context(|| format!("{} is not a list of order records", path.display()))?;
    Ok(records)
}

/// Reduces `records` for `subject` the same way the tracker would, and reports what the customer would see.
pub fn inspect_records(subject: &SubjectId, records: Vec<OrderRecord>) -> Result<String> {
    let mut reducer = OrderSetReducer::default();
    reducer.begin(subject.clone());
    let summary = reducer.apply(subject, records).map_err(|e| anyhow::anyhow!("{e:?}"))?;
    let orders = reducer.active_orders();
    let mut f = String::new();
    writeln!(f, "Active orders for {subject}")?;
    writeln!(f, "{}", format_summary(&summary)?)?;
    writeln!(f, "{}", format_orders(orders))?;
    match detect(orders) {
        Some(selection) => write!(f, "{}", format_selection(&selection))?,
        None => write!(f, "No payment-proof issues")?,
    }
    Ok(f)
}

pub fn inspect_snapshot(subject: &SubjectId, path: &Path) -> Result<String> {
    let records = load_snapshot(path)?;
    info!("🛠️ Inspecting {} records for {subject}", records.len());
    inspect_records(subject, records)
}
