use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{cell, columns, records};

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    if let (Some(rows), Value::Object(envelope)) = (records(value), value) {
        print_array_table(rows);
        print_batch_summary(envelope);
        print_envelope_notes(envelope);
        return;
    }

    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => {
                print_flat_object(result);
                print_envelope_notes(map);
            }
            _ => print_flat_object(map),
        },
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_batch_summary(envelope: &Map<String, Value>) {
    let Some(Value::Object(result)) = envelope.get("result") else {
        return;
    };
    let count = |key: &str| match result.get(key) {
        Some(Value::Array(a)) => a.len().to_string(),
        Some(v) => cell(v),
        None => "0".to_string(),
    };
    println!(
        "\nEntities: {}  Skipped (not in catalog): {}  Skipped (no prices): {}  Rows dropped: {}",
        count("entities_seen"),
        count("skipped_unknown"),
        count("skipped_empty"),
        count("rows_dropped"),
    );
}

fn print_envelope_notes(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(|w| w.as_str()) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_flat_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.clone(), cell(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            println!("{}", cell(item));
        }
        return;
    };

    let headers = columns(first);
    let mut builder = Builder::default();
    builder.push_record(headers.iter().copied());
    for item in arr {
        if let Value::Object(map) = item {
            builder.push_record(headers.iter().map(|h| map.get(*h).map(cell).unwrap_or_default()));
        }
    }
    println!("{}", Table::from(builder));
}
