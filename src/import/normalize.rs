use crate::import::reader::RawRow;
use rust_decimal::Decimal;
use std::str::FromStr;

/// One cleaned product record, ready for the upsert engine.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    /// Upper-cased natural key.
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Option<Decimal>,
}

/// Exporters disagree on header casing, so each column accepts a lower-case
/// and a capitalized alias.
fn field<'a>(row: &'a RawRow, lower: &str, capitalized: &str) -> &'a str {
    row.get(lower)
        .or_else(|| row.get(capitalized))
        .map(String::as_str)
        .unwrap_or("")
}

/// Extract and clean one record from a raw row.
///
/// Rows without a non-empty SKU or name are dropped (`None`) - they still
/// count toward the raw processed tally but never reach the store. A price
/// that fails to parse as a decimal becomes absent rather than an error.
pub fn normalize_row(row: &RawRow) -> Option<NormalizedRow> {
    let sku = field(row, "sku", "SKU").trim();
    let name = field(row, "name", "Name").trim();

    if sku.is_empty() || name.is_empty() {
        return None;
    }

    let description = field(row, "description", "Description").trim();
    let price_raw = field(row, "price", "Price").trim();

    let price = if price_raw.is_empty() {
        None
    } else {
        Decimal::from_str(price_raw).ok()
    };

    Some(NormalizedRow {
        sku: sku.to_uppercase(),
        name: name.to_string(),
        description: if description.is_empty() {
            None
        } else {
            Some(description.to_string())
        },
        price,
    })
}
