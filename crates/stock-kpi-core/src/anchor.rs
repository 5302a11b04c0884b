//! Anchor selection for trailing returns.
//!
//! The anchor for a horizon is picked with a two-phase ascending scan:
//! the first priced point on or after the target date, else the first
//! priced point on or before it. This is deliberately not a
//! nearest-by-distance search.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::types::PricePoint;

/// Trailing-return lookback horizons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    OneYear,
    ThreeYear,
    FiveYear,
}

impl Horizon {
    pub const ALL: [Horizon; 3] = [Horizon::OneYear, Horizon::ThreeYear, Horizon::FiveYear];

    /// Lookback length in calendar years
    pub fn years(&self) -> u32 {
        match self {
            Horizon::OneYear => 1,
            Horizon::ThreeYear => 3,
            Horizon::FiveYear => 5,
        }
    }

    /// Target date for this horizon measured back from `latest`.
    pub fn target_date(&self, latest: NaiveDate) -> Option<NaiveDate> {
        calendar::subtract_years(latest, self.years())
    }
}

/// Resolve the anchor observation for `target` in a date-ascending series.
///
/// Points without an adjusted close are never chosen.
pub fn resolve_anchor(series: &[PricePoint], target: NaiveDate) -> Option<&PricePoint> {
    series
        .iter()
        .find(|p| p.date >= target && p.is_priced())
        .or_else(|| series.iter().find(|p| p.date <= target && p.is_priced()))
}

/// True when the series holds a priced observation on or before `target`,
/// i.e. the price history reaches back to the horizon start.
pub fn covers(series: &[PricePoint], target: NaiveDate) -> bool {
    series.iter().any(|p| p.date <= target && p.is_priced())
}
