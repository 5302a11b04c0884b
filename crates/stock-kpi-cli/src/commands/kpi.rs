use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use std::fmt::Write;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use stock_kpi_core::ingest;
use stock_kpi_core::kpi::{self, HistoryCoverage, SortKey, StockKpiInput};
use stock_kpi_core::returns;
use stock_kpi_core::{EntityCatalog, TrailingReturn};

use crate::input;

/// History coverage required before a horizon is reported
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CoverageArg {
    /// Horizon needs a priced observation on or before its target date
    Strict,
    /// Plain two-phase anchor rule, no history check
    Lenient,
}

impl From<CoverageArg> for HistoryCoverage {
    fn from(arg: CoverageArg) -> Self {
        match arg {
            CoverageArg::Strict => HistoryCoverage::Strict,
            CoverageArg::Lenient => HistoryCoverage::Lenient,
        }
    }
}

/// Record ordering
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    Ticker,
    ExternalId,
    Name,
    /// Entity-key order as computed
    #[value(name = "none")]
    Unsorted,
}

impl SortArg {
    fn key(self) -> Option<SortKey> {
        match self {
            SortArg::Ticker => Some(SortKey::Ticker),
            SortArg::ExternalId => Some(SortKey::ExternalId),
            SortArg::Name => Some(SortKey::DisplayName),
            SortArg::Unsorted => None,
        }
    }
}

/// Arguments for the KPI batch
#[derive(Args)]
pub struct KpisArgs {
    /// Path to price rows: JSON array, or CSV with a header row
    #[arg(long)]
    pub prices: Option<String>,

    /// Path to JSON array of catalog entries (required with --prices)
    #[arg(long)]
    pub catalog: Option<String>,

    /// Override the history coverage policy
    #[arg(long, value_enum)]
    pub coverage: Option<CoverageArg>,

    /// Sort records before output
    #[arg(long, value_enum, default_value = "ticker")]
    pub sort: SortArg,

    /// strftime pattern for latest_date (e.g. "%-m/%-d/%Y"); ISO-8601 if omitted
    #[arg(long)]
    pub date_format: Option<String>,
}

/// Arguments for a single entity's series
#[derive(Args)]
pub struct SeriesArgs {
    /// External id of the entity in the catalog
    #[arg(long)]
    pub id: String,

    /// Path to price rows: JSON array, or CSV with a header row
    #[arg(long)]
    pub prices: Option<String>,

    /// Path to JSON array of catalog entries (required with --prices)
    #[arg(long)]
    pub catalog: Option<String>,
}

/// Arguments for an ad-hoc return
#[derive(Args)]
pub struct ReturnArgs {
    /// Anchor (historical) price
    #[arg(long, allow_hyphen_values = true)]
    pub anchor: Decimal,

    /// Latest price
    #[arg(long, allow_hyphen_values = true)]
    pub latest: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
struct ReturnOutput {
    #[serde(with = "rust_decimal::serde::float")]
    anchor_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    latest_price: Decimal,
    return_pct: TrailingReturn,
}

/// Piped stdin payload for the series command
#[derive(Debug, Deserialize)]
struct SeriesPayload {
    prices: Vec<Value>,
    catalog: EntityCatalog,
}

/// Raw rows are returned unvalidated; ingestion judges each one.
fn load_price_rows(path: &str) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
    if input::file::is_csv(path) {
        input::file::read_csv_objects(path)
    } else {
        input::file::read_json(path)
    }
}

fn load_files(
    prices: &str,
    catalog: &Option<String>,
) -> Result<(Vec<Value>, EntityCatalog), Box<dyn std::error::Error>> {
    let Some(catalog_path) = catalog else {
        return Err("--catalog <file.json> is required with --prices".into());
    };
    let rows = load_price_rows(prices)?;
    let catalog: EntityCatalog = input::file::read_json(catalog_path)?;
    Ok((rows, catalog))
}

/// Re-render every record's `latest_date` with a strftime pattern.
///
/// Patterns asking for time-of-day fields (`%H`, `%z`, ...) fail on a
/// calendar date and are reported as errors.
fn reformat_dates(value: &mut Value, pattern: &str) -> Result<(), Box<dyn std::error::Error>> {
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(format!("Invalid --date-format pattern '{}'", pattern).into());
    }
    let Some(records) = value
        .pointer_mut("/result/records")
        .and_then(|r| r.as_array_mut())
    else {
        return Ok(());
    };
    for record in records {
        if let Some(field) = record.get_mut("latest_date") {
            if let Some(date) = field.as_str().and_then(|s| s.parse::<NaiveDate>().ok()) {
                let mut rendered = String::new();
                write!(rendered, "{}", date.format(pattern)).map_err(|_| {
                    format!("--date-format '{}' needs fields a date does not have", pattern)
                })?;
                *field = Value::String(rendered);
            }
        }
    }
    Ok(())
}

pub fn run_kpis(args: KpisArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut kpi_input: StockKpiInput = if let Some(ref path) = args.prices {
        let (prices, catalog) = load_files(path, &args.catalog)?;
        StockKpiInput {
            prices,
            catalog,
            config: Default::default(),
        }
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--prices <file> --catalog <file.json> or stdin required for kpis".into());
    };
    if let Some(coverage) = args.coverage {
        kpi_input.config.coverage = coverage.into();
    }

    let mut output = kpi::calculate_stock_kpis(&kpi_input);
    if let Some(key) = args.sort.key() {
        kpi::sort_records(&mut output.result.records, key);
    }

    let mut value = serde_json::to_value(output)?;
    if let Some(ref pattern) = args.date_format {
        reformat_dates(&mut value, pattern)?;
    }
    Ok(value)
}

pub fn run_series(args: SeriesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (rows, catalog) = if let Some(ref path) = args.prices {
        load_files(path, &args.catalog)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        let payload: SeriesPayload = serde_json::from_value(data)?;
        (payload.prices, payload.catalog)
    } else {
        return Err("--prices <file> --catalog <file.json> or stdin required for series".into());
    };

    let ingested = ingest::ingest_rows(&rows);
    if ingested.dropped > 0 {
        tracing::warn!(dropped = ingested.dropped, "dropped malformed price rows");
    }
    let series = kpi::entity_series(ingested.points, &catalog, &args.id)?;
    Ok(serde_json::to_value(series)?)
}

pub fn run_return(args: ReturnArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let output = ReturnOutput {
        anchor_price: args.anchor,
        latest_price: args.latest,
        return_pct: returns::percent_return(args.anchor, args.latest),
    };
    Ok(serde_json::to_value(output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_reformat_dates() {
        let mut value = json!({"result": {"records": [{"latest_date": "2022-01-05"}]}});
        reformat_dates(&mut value, "%-m/%-d/%Y").unwrap();
        assert_eq!(value["result"]["records"][0]["latest_date"], json!("1/5/2022"));
    }

    #[test]
    fn test_reformat_dates_rejects_bad_pattern() {
        let mut value = json!({"result": {"records": []}});
        assert!(reformat_dates(&mut value, "%Q").is_err());
    }

    #[test]
    fn test_reformat_dates_rejects_time_fields() {
        for pattern in ["%H", "%Y %H:%M", "%Y-%m-%d %z"] {
            let mut value = json!({"result": {"records": [{"latest_date": "2022-01-05"}]}});
            let err = reformat_dates(&mut value, pattern).unwrap_err();
            assert!(err.to_string().contains("--date-format"));
            assert_eq!(value["result"]["records"][0]["latest_date"], json!("2022-01-05"));
        }
    }

    #[test]
    fn test_run_return() {
        let value = run_return(ReturnArgs {
            anchor: dec!(110),
            latest: dec!(121),
        })
        .unwrap();
        assert_eq!(value["return_pct"].as_f64(), Some(10.0));

        let value = run_return(ReturnArgs {
            anchor: Decimal::ZERO,
            latest: dec!(121),
        })
        .unwrap();
        assert_eq!(value["return_pct"], json!("N/A"));
    }

    #[test]
    fn test_sort_arg_mapping() {
        assert_eq!(SortArg::Unsorted.key(), None);
        assert_eq!(SortArg::Name.key(), Some(SortKey::DisplayName));
    }
}
