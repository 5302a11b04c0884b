//! Raw price-row ingestion.
//!
//! Rows arrive the way the upstream stock collection stores them: keys may use
//! the upstream column names (`UNIQUE_CARRIER_NAME`, `Date`, `Adj Close`) and
//! numbers may be wrapped in MongoDB extended JSON (`{"$numberDouble": "1.5"}`).
//! Each row is deserialized on its own and every field is kept as a raw JSON
//! value, so one odd row (a `null`, a row repeating a field under its alias)
//! never sinks the batch. Rows that cannot be coerced are dropped and counted.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::types::{Money, PricePoint};

/// One raw daily price row. Only `entity_key`, `date` and `adjusted_close`
/// are read; the remaining columns are accepted and ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPriceRow {
    #[serde(default, alias = "UNIQUE_CARRIER_NAME", alias = "entityKey")]
    pub entity_key: Option<Value>,
    #[serde(default, alias = "Date")]
    pub date: Option<Value>,
    #[serde(default, alias = "Open")]
    pub open: Option<Value>,
    #[serde(default, alias = "High")]
    pub high: Option<Value>,
    #[serde(default, alias = "Low")]
    pub low: Option<Value>,
    #[serde(default, alias = "Close")]
    pub close: Option<Value>,
    #[serde(default, alias = "Adj Close", alias = "adjustedClose", alias = "adjClose")]
    pub adjusted_close: Option<Value>,
    #[serde(default, alias = "Volume")]
    pub volume: Option<Value>,
}

/// Why a row was dropped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowRejection {
    #[error("missing entity key")]
    MissingEntityKey,

    #[error("missing date")]
    MissingDate,

    #[error("unparseable date {0}")]
    BadDate(String),

    #[error("non-numeric {field}: {value}")]
    BadNumber { field: String, value: String },

    #[error("malformed row: {0}")]
    Malformed(String),
}

/// Result of ingesting a batch of rows
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub points: Vec<PricePoint>,
    pub dropped: usize,
    pub warnings: Vec<String>,
}

impl IngestOutcome {
    fn reject(&mut self, index: usize, reason: RowRejection) {
        tracing::debug!(row = index, %reason, "dropping price row");
        self.dropped += 1;
        self.warnings.push(format!("row {index}: {reason}"));
    }
}

/// Convert raw JSON rows into price points, dropping malformed rows.
pub fn ingest_rows(rows: &[Value]) -> IngestOutcome {
    let mut outcome = IngestOutcome::default();
    for (index, value) in rows.iter().enumerate() {
        match RawPriceRow::deserialize(value)
            .map_err(|e| RowRejection::Malformed(e.to_string()))
            .and_then(|row| to_price_point(&row))
        {
            Ok(point) => outcome.points.push(point),
            Err(reason) => outcome.reject(index, reason),
        }
    }
    outcome
}

/// Coerce one raw row.
pub fn to_price_point(row: &RawPriceRow) -> Result<PricePoint, RowRejection> {
    let entity_key = match row.entity_key.as_ref() {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(RowRejection::MissingEntityKey),
    };

    let date = match row.date.as_ref() {
        None | Some(Value::Null) => return Err(RowRejection::MissingDate),
        Some(v) => parse_date(v).ok_or_else(|| RowRejection::BadDate(v.to_string()))?,
    };

    let adjusted_close = match row.adjusted_close.as_ref() {
        None => None,
        Some(v) => parse_number(v).map_err(|_| RowRejection::BadNumber {
            field: "adjusted_close".into(),
            value: v.to_string(),
        })?,
    };

    Ok(PricePoint {
        entity_key,
        date,
        adjusted_close,
    })
}

/// Coerce a JSON value into a decimal.
///
/// `null`, empty strings and NaN are treated as absent (`Ok(None)`);
/// anything else that is not numeric is an error.
pub fn parse_number(value: &Value) -> Result<Option<Money>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(Decimal::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Some(Decimal::from(u)))
            } else {
                let f = n.as_f64().ok_or_else(|| format!("unrepresentable number {n}"))?;
                Decimal::try_from(f).map(Some).map_err(|e| e.to_string())
            }
        }
        Value::String(s) => parse_number_str(s),
        Value::Object(map) => {
            let wrapped = ["$numberDouble", "$numberDecimal", "$numberInt", "$numberLong"]
                .iter()
                .find_map(|k| map.get(*k));
            match wrapped {
                Some(inner) if map.len() == 1 => parse_number(inner),
                _ => Err(format!("unsupported object {value}")),
            }
        }
        Value::Bool(_) | Value::Array(_) => Err(format!("unsupported value {value}")),
    }
}

fn parse_number_str(s: &str) -> Result<Option<Money>, String> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    s.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(s))
        .map(Some)
        .map_err(|e| format!("'{s}': {e}"))
}

/// Coerce a JSON value into a calendar date.
///
/// Accepts ISO dates, RFC 3339 timestamps (date taken in UTC), naive
/// timestamps, `M/D/YYYY`, epoch milliseconds, and extended JSON
/// `{"$date": ...}` wrapping any of those.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => parse_date_str(s),
        Value::Number(n) => n.as_i64().and_then(from_epoch_millis),
        Value::Object(map) => {
            if let Some(inner) = map.get("$date") {
                parse_date(inner)
            } else if let Some(Value::String(ms)) = map.get("$numberLong") {
                ms.parse::<i64>().ok().and_then(from_epoch_millis)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(s, "%m/%d/%Y").ok()
}

fn from_epoch_millis(ms: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_number_forms() {
        assert_eq!(parse_number(&json!(121)), Ok(Some(dec!(121))));
        assert_eq!(parse_number(&json!(12.5)), Ok(Some(dec!(12.5))));
        assert_eq!(parse_number(&json!("33.10")), Ok(Some(dec!(33.10))));
        assert_eq!(parse_number(&json!("1.5e2")), Ok(Some(dec!(150))));
        assert_eq!(parse_number(&json!({"$numberDouble": "45.25"})), Ok(Some(dec!(45.25))));
        assert_eq!(parse_number(&json!({"$numberInt": "7"})), Ok(Some(dec!(7))));
        assert_eq!(parse_number(&json!({"$numberLong": "9000000000"})), Ok(Some(dec!(9000000000))));
    }

    #[test]
    fn test_parse_number_absent_forms() {
        assert_eq!(parse_number(&Value::Null), Ok(None));
        assert_eq!(parse_number(&json!("")), Ok(None));
        assert_eq!(parse_number(&json!({"$numberDouble": "NaN"})), Ok(None));
    }

    #[test]
    fn test_parse_number_rejects_garbage() {
        assert!(parse_number(&json!("abc")).is_err());
        assert!(parse_number(&json!(true)).is_err());
        assert!(parse_number(&json!({"price": 1})).is_err());
    }

    #[test]
    fn test_parse_date_forms() {
        assert_eq!(parse_date(&json!("2022-01-01")), Some(d("2022-01-01")));
        assert_eq!(parse_date(&json!("2022-01-01T00:00:00.000Z")), Some(d("2022-01-01")));
        assert_eq!(parse_date(&json!("2022-01-01T23:30:00-05:00")), Some(d("2022-01-02")));
        assert_eq!(parse_date(&json!("2022-03-04 10:00:00")), Some(d("2022-03-04")));
        assert_eq!(parse_date(&json!("3/4/2022")), Some(d("2022-03-04")));
        assert_eq!(parse_date(&json!({"$date": "2021-06-30T00:00:00Z"})), Some(d("2021-06-30")));
        assert_eq!(
            parse_date(&json!({"$date": {"$numberLong": "1640995200000"}})),
            Some(d("2022-01-01"))
        );
        assert_eq!(parse_date(&json!(1640995200000i64)), Some(d("2022-01-01")));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date(&json!("yesterday")), None);
        assert_eq!(parse_date(&json!("2022-13-01")), None);
        assert_eq!(parse_date(&json!([2022, 1, 1])), None);
    }

    #[test]
    fn test_row_aliases() {
        let row: RawPriceRow = serde_json::from_value(json!({
            "UNIQUE_CARRIER_NAME": "Delta Air Lines Inc.",
            "Date": {"$date": "2022-01-03T00:00:00Z"},
            "Open": {"$numberDouble": "39.5"},
            "Adj Close": {"$numberDouble": "40.12"},
            "Volume": {"$numberInt": "1000"}
        }))
        .unwrap();
        let point = to_price_point(&row).unwrap();
        assert_eq!(point.entity_key, "Delta Air Lines Inc.");
        assert_eq!(point.date, d("2022-01-03"));
        assert_eq!(point.adjusted_close, Some(dec!(40.12)));
    }

    #[test]
    fn test_missing_price_is_kept() {
        let row = RawPriceRow {
            entity_key: Some(json!("A")),
            date: Some(json!("2022-01-01")),
            ..Default::default()
        };
        let point = to_price_point(&row).unwrap();
        assert_eq!(point.adjusted_close, None);
    }

    #[test]
    fn test_rejections() {
        let no_key = RawPriceRow {
            date: Some(json!("2022-01-01")),
            ..Default::default()
        };
        assert_eq!(to_price_point(&no_key), Err(RowRejection::MissingEntityKey));

        let blank_key = RawPriceRow {
            entity_key: Some(json!("  ")),
            date: Some(json!("2022-01-01")),
            ..Default::default()
        };
        assert_eq!(to_price_point(&blank_key), Err(RowRejection::MissingEntityKey));

        let no_date = RawPriceRow {
            entity_key: Some(json!("A")),
            ..Default::default()
        };
        assert_eq!(to_price_point(&no_date), Err(RowRejection::MissingDate));

        let bad_price = RawPriceRow {
            entity_key: Some(json!("A")),
            date: Some(json!("2022-01-01")),
            adjusted_close: Some(json!("n/a")),
            ..Default::default()
        };
        assert!(matches!(
            to_price_point(&bad_price),
            Err(RowRejection::BadNumber { .. })
        ));
    }

    fn rows(value: Value) -> Vec<Value> {
        match value {
            Value::Array(rows) => rows,
            other => panic!("expected array, got {other}"),
        }
    }

    #[test]
    fn test_ingest_counts_drops() {
        let rows = rows(json!([
            {"entity_key": "A", "date": "2022-01-01", "adjusted_close": 10},
            {"entity_key": "A", "date": "not a date", "adjusted_close": 11},
            {"entity_key": ["A"], "date": "2022-01-01"},
            {"entity_key": "B", "date": "2022-01-01"}
        ]));
        let outcome = ingest_rows(&rows);
        assert_eq!(outcome.points.len(), 2);
        assert_eq!(outcome.dropped, 2);
        assert_eq!(outcome.warnings.len(), 2);
        assert!(outcome.warnings[0].starts_with("row 1:"));
    }

    #[test]
    fn test_ingest_ignores_unused_columns() {
        let rows = rows(json!([
            {"entity_key": "A", "date": "2022-01-01", "adjusted_close": 1, "close": "ignored garbage"},
            {}
        ]));
        let outcome = ingest_rows(&rows);
        assert_eq!(outcome.points.len(), 1);
        assert_eq!(outcome.dropped, 1);
    }

    #[test]
    fn test_null_and_non_object_rows_are_dropped() {
        let rows = rows(json!([
            {"entity_key": "A", "date": "2022-01-01", "adjusted_close": 10},
            null,
            "A,2022-01-02,11",
            {"entity_key": "A", "date": "2022-01-03", "adjusted_close": 12}
        ]));
        let outcome = ingest_rows(&rows);
        assert_eq!(outcome.points.len(), 2);
        assert_eq!(outcome.dropped, 2);
        assert!(outcome.warnings[0].starts_with("row 1: malformed row"));
        assert!(outcome.warnings[1].starts_with("row 2: malformed row"));
    }

    #[test]
    fn test_field_repeated_under_alias_is_dropped() {
        let rows = rows(json!([
            {"entity_key": "A", "date": "2022-01-01", "adjusted_close": 10},
            {"entity_key": "A", "Date": "2022-01-02", "date": "2022-01-02", "adjusted_close": 11},
            {"UNIQUE_CARRIER_NAME": "A", "entity_key": "A", "date": "2022-01-03"},
            {"entity_key": "A", "date": "2022-01-04", "Close": 1, "close": 1, "adjusted_close": 13}
        ]));
        let outcome = ingest_rows(&rows);
        assert_eq!(outcome.points.len(), 1);
        assert_eq!(outcome.dropped, 3);
        assert!(outcome
            .warnings
            .iter()
            .all(|w| w.contains("malformed row") && w.contains("duplicate field")));
    }
}
