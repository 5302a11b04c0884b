use std::collections::BTreeMap;

use crate::types::{EntitySeries, Money, PricePoint};

/// Partition a flat list of observations by entity key.
///
/// Input order is preserved inside each group. No validation happens here.
pub fn group_by_entity(points: impl IntoIterator<Item = PricePoint>) -> BTreeMap<String, EntitySeries> {
    let mut groups: BTreeMap<String, EntitySeries> = BTreeMap::new();
    for point in points {
        groups.entry(point.entity_key.clone()).or_default().push(point);
    }
    groups
}

/// Sort a series by date ascending. Stable: same-date points keep input order.
pub fn sort_series(series: &mut EntitySeries) {
    series.sort_by_key(|p| p.date);
}

/// Last observation with a present adjusted close in a sorted series,
/// together with that close.
pub fn latest_priced(series: &[PricePoint]) -> Option<(&PricePoint, Money)> {
    series
        .iter()
        .rev()
        .find_map(|p| p.adjusted_close.map(|price| (p, price)))
}
