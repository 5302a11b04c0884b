use serde_json::Value;

use super::{cell, records};

/// Print just the key answer from the output.
///
/// KPI batches print one line per record; anything else prints the return
/// percentage when present, then falls back to the first result field.
pub fn print_minimal(value: &Value) {
    if let Some(rows) = records(value) {
        for row in rows {
            println!("{}", record_line(row));
        }
        return;
    }

    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        if let Some(val) = map.get("return_pct").filter(|v| !v.is_null()) {
            println!("{}", cell(val));
            return;
        }
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, cell(val));
            return;
        }
    }

    println!("{}", cell(result_obj));
}

/// `TICKER 1y 3y 5y` for one KPI record.
fn record_line(row: &Value) -> String {
    let field = |key: &str| row.get(key).map(cell).unwrap_or_default();
    format!(
        "{} {} {} {}",
        field("ticker"),
        field("one_year_return"),
        field("three_year_return"),
        field("five_year_return"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_line() {
        let row = json!({
            "ticker": "DAL",
            "one_year_return": 10.0,
            "three_year_return": "N/A",
            "five_year_return": "N/A"
        });
        assert_eq!(record_line(&row), "DAL 10.0 N/A N/A");
    }
}
