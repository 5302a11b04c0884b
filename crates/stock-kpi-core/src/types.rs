use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Prices. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Percentages expressed as percent points (10 = 10%), not as decimals.
pub type Percent = Decimal;

/// Marker emitted in place of a return that cannot be computed.
pub const NOT_AVAILABLE: &str = "N/A";

/// A single dated price observation for one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub entity_key: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjusted_close: Option<Money>,
}

impl PricePoint {
    pub fn new(entity_key: impl Into<String>, date: NaiveDate, adjusted_close: Option<Money>) -> Self {
        Self {
            entity_key: entity_key.into(),
            date,
            adjusted_close,
        }
    }

    /// True when the observation carries a usable adjusted close.
    pub fn is_priced(&self) -> bool {
        self.adjusted_close.is_some()
    }
}

/// Observations of one entity. Date-ascending once passed through
/// [`crate::series::sort_series`].
pub type EntitySeries = Vec<PricePoint>;

/// Static reference data used to decorate KPI output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCatalogEntry {
    pub entity_key: String,
    pub display_name: String,
    pub ticker: String,
    pub external_id: String,
}

/// Catalog entries keyed by entity key.
///
/// Later entries with a duplicate key replace earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<EntityCatalogEntry>", into = "Vec<EntityCatalogEntry>")]
pub struct EntityCatalog {
    entries: BTreeMap<String, EntityCatalogEntry>,
}

impl EntityCatalog {
    pub fn new(entries: impl IntoIterator<Item = EntityCatalogEntry>) -> Self {
        entries.into_iter().collect()
    }

    pub fn get(&self, entity_key: &str) -> Option<&EntityCatalogEntry> {
        self.entries.get(entity_key)
    }

    /// Linear lookup by the caller-facing identifier.
    pub fn find_by_external_id(&self, external_id: &str) -> Option<&EntityCatalogEntry> {
        self.entries.values().find(|e| e.external_id == external_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<EntityCatalogEntry> for EntityCatalog {
    fn from_iter<I: IntoIterator<Item = EntityCatalogEntry>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .map(|e| (e.entity_key.clone(), e))
            .collect();
        Self { entries }
    }
}

impl From<Vec<EntityCatalogEntry>> for EntityCatalog {
    fn from(entries: Vec<EntityCatalogEntry>) -> Self {
        entries.into_iter().collect()
    }
}

impl From<EntityCatalog> for Vec<EntityCatalogEntry> {
    fn from(catalog: EntityCatalog) -> Self {
        catalog.entries.into_values().collect()
    }
}

/// A trailing return that is either computed or explicitly unavailable.
///
/// Serializes as a JSON number or the literal string `"N/A"`. Unavailable is
/// never encoded as zero, null or NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingReturn {
    Percent(Percent),
    NotAvailable,
}

impl From<Option<Percent>> for TrailingReturn {
    fn from(value: Option<Percent>) -> Self {
        value.map_or(TrailingReturn::NotAvailable, TrailingReturn::Percent)
    }
}

impl fmt::Display for TrailingReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrailingReturn::Percent(p) => write!(f, "{}", p.normalize()),
            TrailingReturn::NotAvailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

impl Serialize for TrailingReturn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TrailingReturn::Percent(p) => rust_decimal::serde::float::serialize(p, serializer),
            TrailingReturn::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

impl<'de> Deserialize<'de> for TrailingReturn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TrailingReturnVisitor;

        impl Visitor<'_> for TrailingReturnVisitor {
            type Value = TrailingReturn;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a percentage or \"{NOT_AVAILABLE}\"")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Decimal::try_from(v)
                    .map(TrailingReturn::Percent)
                    .map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(TrailingReturn::Percent(Decimal::from(v)))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(TrailingReturn::Percent(Decimal::from(v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                if v == NOT_AVAILABLE {
                    return Ok(TrailingReturn::NotAvailable);
                }
                v.parse::<Decimal>()
                    .map(TrailingReturn::Percent)
                    .map_err(E::custom)
            }
        }

        deserializer.deserialize_any(TrailingReturnVisitor)
    }
}

/// Per-entity KPI output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiRecord {
    pub external_id: String,
    pub display_name: String,
    pub ticker: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub latest_price: Money,
    pub latest_date: NaiveDate,
    pub one_year_return: TrailingReturn,
    pub three_year_return: TrailingReturn,
    pub five_year_return: TrailingReturn,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
