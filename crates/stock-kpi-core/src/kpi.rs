use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::anchor::{self, Horizon};
use crate::error::KpiError;
use crate::ingest;
use crate::returns;
use crate::series;
use crate::types::*;
use crate::KpiResult;

/// How much price history a horizon needs before a return is reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryCoverage {
    /// The series must hold a priced observation on or before the horizon's
    /// target date; otherwise the horizon is `N/A`.
    #[default]
    Strict,
    /// Plain two-phase anchor rule with no history check. A short series
    /// reports every horizon measured from its first priced point.
    Lenient,
}

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiConfig {
    #[serde(default)]
    pub coverage: HistoryCoverage,
}

/// What happened to one entity during assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityOutcome {
    Record(KpiRecord),
    /// No observation with an adjusted close
    Empty,
    /// Not present in the catalog
    Unknown,
}

/// Trailing return for one horizon of a date-ascending series.
pub fn trailing_return(
    series: &[PricePoint],
    latest: &PricePoint,
    horizon: Horizon,
    coverage: HistoryCoverage,
) -> TrailingReturn {
    let Some(latest_price) = latest.adjusted_close else {
        return TrailingReturn::NotAvailable;
    };
    let Some(target) = horizon.target_date(latest.date) else {
        return TrailingReturn::NotAvailable;
    };
    if coverage == HistoryCoverage::Strict && !anchor::covers(series, target) {
        return TrailingReturn::NotAvailable;
    }
    returns::return_from_anchor(anchor::resolve_anchor(series, target), latest_price)
}

/// Build the KPI record for one sorted entity series.
pub fn assemble_entity(
    entity_key: &str,
    series: &[PricePoint],
    catalog: &EntityCatalog,
    config: &KpiConfig,
) -> EntityOutcome {
    let Some((latest, latest_price)) = series::latest_priced(series) else {
        return EntityOutcome::Empty;
    };
    let Some(entry) = catalog.get(entity_key) else {
        return EntityOutcome::Unknown;
    };

    let [one, three, five] =
        Horizon::ALL.map(|h| trailing_return(series, latest, h, config.coverage));

    EntityOutcome::Record(KpiRecord {
        external_id: entry.external_id.clone(),
        display_name: entry.display_name.clone(),
        ticker: entry.ticker.clone(),
        latest_price,
        latest_date: latest.date,
        one_year_return: one,
        three_year_return: three,
        five_year_return: five,
    })
}

/// Per-batch results with the entities that were filtered out
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiBatch {
    pub records: Vec<KpiRecord>,
    pub entities_seen: usize,
    pub skipped_empty: Vec<String>,
    pub skipped_unknown: Vec<String>,
}

/// Group, sort and assemble every entity. Records come out in entity-key
/// order regardless of whether the `parallel` feature is enabled.
pub fn assemble_batch(
    points: impl IntoIterator<Item = PricePoint>,
    catalog: &EntityCatalog,
    config: &KpiConfig,
) -> KpiBatch {
    let groups: Vec<(String, EntitySeries)> = series::group_by_entity(points).into_iter().collect();
    let entities_seen = groups.len();

    let assemble = |(key, mut series): (String, EntitySeries)| {
        series::sort_series(&mut series);
        let outcome = assemble_entity(&key, &series, catalog, config);
        (key, outcome)
    };

    #[cfg(feature = "parallel")]
    let outcomes: Vec<(String, EntityOutcome)> = groups.into_par_iter().map(assemble).collect();
    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<(String, EntityOutcome)> = groups.into_iter().map(assemble).collect();

    let mut batch = KpiBatch {
        entities_seen,
        ..Default::default()
    };
    for (key, outcome) in outcomes {
        match outcome {
            EntityOutcome::Record(record) => batch.records.push(record),
            EntityOutcome::Empty => {
                tracing::debug!(entity = %key, "skipping entity with no priced observations");
                batch.skipped_empty.push(key);
            }
            EntityOutcome::Unknown => {
                tracing::debug!(entity = %key, "skipping entity missing from catalog");
                batch.skipped_unknown.push(key);
            }
        }
    }
    batch
}

/// Compute KPI records for every catalogued entity with usable prices.
///
/// Never fails: unusable entities are dropped and unavailable horizons are
/// reported as `N/A`.
pub fn compute_kpis(
    points: impl IntoIterator<Item = PricePoint>,
    catalog: &EntityCatalog,
    config: &KpiConfig,
) -> Vec<KpiRecord> {
    assemble_batch(points, catalog, config).records
}

/// Input for a full KPI run from raw rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockKpiInput {
    /// Raw rows, each judged on its own by [`ingest::ingest_rows`]
    pub prices: Vec<Value>,
    pub catalog: EntityCatalog,
    #[serde(default)]
    pub config: KpiConfig,
}

impl StockKpiInput {
    /// Parse a `{"prices": [...], "catalog": [...], "config": {...}}` payload.
    pub fn from_json(json: &str) -> KpiResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Output of a full KPI run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockKpiOutput {
    pub records: Vec<KpiRecord>,
    pub entities_seen: usize,
    pub skipped_empty: Vec<String>,
    pub skipped_unknown: Vec<String>,
    pub rows_dropped: usize,
}

/// Ingest raw rows and compute trailing-return KPIs.
pub fn calculate_stock_kpis(input: &StockKpiInput) -> ComputationOutput<StockKpiOutput> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.catalog.is_empty() {
        warnings.push("Catalog is empty; no KPI records can be emitted".into());
    }

    let ingested = ingest::ingest_rows(&input.prices);
    warnings.extend(ingested.warnings);

    let batch = assemble_batch(ingested.points, &input.catalog, &input.config);
    if !batch.skipped_unknown.is_empty() {
        warnings.push(format!(
            "{} entities not in catalog: {}",
            batch.skipped_unknown.len(),
            batch.skipped_unknown.join(", ")
        ));
    }

    tracing::info!(
        rows = input.prices.len(),
        dropped = ingested.dropped,
        entities = batch.entities_seen,
        records = batch.records.len(),
        "computed stock KPIs"
    );

    let output = StockKpiOutput {
        records: batch.records,
        entities_seen: batch.entities_seen,
        skipped_empty: batch.skipped_empty,
        skipped_unknown: batch.skipped_unknown,
        rows_dropped: ingested.dropped,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Trailing 1/3/5-year simple returns: first priced point on/after target, else first on/before",
        &serde_json::json!({
            "rows": input.prices.len(),
            "catalog_entries": input.catalog.len(),
            "coverage": input.config.coverage,
            "horizons_years": Horizon::ALL.map(|h| h.years()),
        }),
        warnings,
        elapsed,
        output,
    )
}

/// Sorted observations of the catalogued entity with `external_id`.
///
/// An id missing from the catalog is an error; a catalogued entity with no
/// observations yields an empty series.
pub fn entity_series(
    points: impl IntoIterator<Item = PricePoint>,
    catalog: &EntityCatalog,
    external_id: &str,
) -> KpiResult<EntitySeries> {
    let entry = catalog
        .find_by_external_id(external_id)
        .ok_or_else(|| KpiError::UnknownEntity(external_id.to_string()))?;
    let mut series: EntitySeries = points
        .into_iter()
        .filter(|p| p.entity_key == entry.entity_key)
        .collect();
    series::sort_series(&mut series);
    Ok(series)
}

/// Post-processing order for KPI records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Ticker,
    ExternalId,
    DisplayName,
}

/// Stable sort of KPI records by the given key.
pub fn sort_records(records: &mut [KpiRecord], key: SortKey) {
    match key {
        SortKey::Ticker => records.sort_by(|a, b| a.ticker.cmp(&b.ticker)),
        SortKey::ExternalId => records.sort_by(|a, b| a.external_id.cmp(&b.external_id)),
        SortKey::DisplayName => records.sort_by(|a, b| a.display_name.cmp(&b.display_name)),
    }
}
