use serde_json::Value;
use std::io;

use super::{cell, columns, records};

/// Write output as CSV to stdout.
///
/// KPI envelopes become one row per record; other shapes fall back to a
/// two-column `field,value` listing.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    write_csv(&mut wtr, value);
    let _ = wtr.flush();
}

fn write_csv<W: io::Write>(wtr: &mut csv::Writer<W>, value: &Value) {
    if let Some(rows) = records(value) {
        write_array_csv(wtr, rows);
        return;
    }

    match value {
        Value::Object(map) => {
            let fields = match map.get("result") {
                Some(Value::Object(result)) => result,
                _ => map,
            };
            let _ = wtr.write_record(["field", "value"]);
            for (key, val) in fields {
                let _ = wtr.write_record([key.as_str(), &cell(val)]);
            }
        }
        Value::Array(arr) => write_array_csv(wtr, arr),
        _ => {
            let _ = wtr.write_record([&cell(value)]);
        }
    }
}

fn write_array_csv<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            let _ = wtr.write_record([&cell(item)]);
        }
        return;
    };

    let headers = columns(first);
    let _ = wtr.write_record(&headers);
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(cell).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(value: &Value) -> String {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        write_csv(&mut wtr, value);
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_records_one_row_each() {
        let value = json!({"result": {"records": [
            {"ticker": "DAL", "one_year_return": 10.0},
            {"ticker": "UAL", "one_year_return": "N/A"}
        ]}});
        let out = render(&value);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, vec!["ticker,one_year_return", "DAL,10.0", "UAL,N/A"]);
    }

    #[test]
    fn test_flat_object() {
        let out = render(&json!({"return_pct": "N/A"}));
        assert_eq!(out, "field,value\nreturn_pct,N/A\n");
    }
}
