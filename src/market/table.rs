//! Market rows

use super::client::MarketItem;
use crate::error::Result;
use crate::schema::RawTable;
use serde_json::Value;
use std::collections::HashMap;

/// Output columns, in file order
pub const MARKET_COLUMNS: [&str; 25] = [
    "region_id",
    "region_name",
    "typeid",
    "item_name",
    "timestamp_pulled",
    "last_data",
    "vol_yesterday",
    "vol_week",
    "vol_month",
    "avg_price_yesterday",
    "avg_price_week",
    "avg_price_month",
    "size_yesterday",
    "size_week",
    "size_month",
    "high_yesterday",
    "high_week",
    "high_month",
    "low_yesterday",
    "low_week",
    "low_month",
    "vwap_week",
    "vwap_month",
    "_52w_high",
    "_52w_low",
];

const UNKNOWN_ITEM: &str = "Unknown";

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Build the market table. Statistics the API did not return are empty
/// cells; fields outside [`MARKET_COLUMNS`] are dropped.
pub fn market_table<'a>(
    items: impl IntoIterator<Item = &'a MarketItem>,
    type_names: &HashMap<String, String>,
    pulled_at: &str,
) -> Result<RawTable> {
    let mut table = RawTable::new(MARKET_COLUMNS.iter().map(ToString::to_string).collect());

    for item in items {
        let mut row = Vec::with_capacity(MARKET_COLUMNS.len());
        row.push(item.region_id.to_string());
        row.push(item.region_name.clone());
        row.push(item.typeid.clone());
        row.push(
            type_names
                .get(&item.typeid)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_ITEM.to_string()),
        );
        row.push(pulled_at.to_string());
        row.extend(MARKET_COLUMNS[5..].iter().map(|name| cell(item.stats.get(*name))));
        table.push_row(row)?;
    }

    Ok(table)
}
