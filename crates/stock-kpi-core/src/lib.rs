pub mod anchor;
pub mod calendar;
pub mod error;
pub mod ingest;
pub mod kpi;
pub mod returns;
pub mod series;
pub mod types;

pub use error::KpiError;
pub use types::*;

/// Standard result type for all stock-kpi operations
pub type KpiResult<T> = Result<T, KpiError>;
