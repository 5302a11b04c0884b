pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// KPI record columns in display order; other keys follow.
const KPI_COLUMNS: [&str; 8] = [
    "external_id",
    "ticker",
    "display_name",
    "latest_price",
    "latest_date",
    "one_year_return",
    "three_year_return",
    "five_year_return",
];

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The KPI record array inside a computation envelope, if present.
pub fn records(value: &Value) -> Option<&Vec<Value>> {
    value.pointer("/result/records").and_then(|r| r.as_array())
}

/// Column order for an array of objects, keyed off its first row.
pub fn columns(first: &Map<String, Value>) -> Vec<&str> {
    let mut cols: Vec<&str> = KPI_COLUMNS
        .iter()
        .copied()
        .filter(|c| first.contains_key(*c))
        .collect();
    cols.extend(
        first
            .keys()
            .map(|k| k.as_str())
            .filter(|k| !KPI_COLUMNS.contains(k)),
    );
    cols
}

/// Render a scalar for a single cell; nested values fall back to JSON.
pub fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => arr.iter().map(cell).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
