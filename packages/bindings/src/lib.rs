use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use stock_kpi_core::ingest;
use stock_kpi_core::kpi::{self, StockKpiInput};
use stock_kpi_core::{returns, EntityCatalog};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

#[derive(Deserialize)]
struct SeriesInput {
    prices: Vec<Value>,
    catalog: EntityCatalog,
    external_id: String,
}

#[derive(Deserialize)]
struct ReturnInput {
    anchor_price: Decimal,
    latest_price: Decimal,
}

// ---------------------------------------------------------------------------
// Stock KPIs
// ---------------------------------------------------------------------------

#[napi]
pub fn compute_stock_kpis(input_json: String) -> NapiResult<String> {
    let input = StockKpiInput::from_json(&input_json).map_err(to_napi_error)?;
    let output = kpi::calculate_stock_kpis(&input);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn entity_series(input_json: String) -> NapiResult<String> {
    let input: SeriesInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let ingested = ingest::ingest_rows(&input.prices);
    let series = kpi::entity_series(ingested.points, &input.catalog, &input.external_id)
        .map_err(to_napi_error)?;
    serde_json::to_string(&series).map_err(to_napi_error)
}

#[napi]
pub fn trailing_return(input_json: String) -> NapiResult<String> {
    let input: ReturnInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let ret = returns::percent_return(input.anchor_price, input.latest_price);
    serde_json::to_string(&ret).map_err(to_napi_error)
}
