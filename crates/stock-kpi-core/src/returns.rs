use rust_decimal_macros::dec;

use crate::types::{Money, PricePoint, TrailingReturn};

/// Simple percentage return from `anchor` to `latest`.
///
/// `((latest - anchor) / anchor) * 100`. A zero anchor or any decimal
/// overflow yields [`TrailingReturn::NotAvailable`].
pub fn percent_return(anchor: Money, latest: Money) -> TrailingReturn {
    if anchor.is_zero() {
        return TrailingReturn::NotAvailable;
    }
    latest
        .checked_sub(anchor)
        .and_then(|gain| gain.checked_div(anchor))
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .into()
}

/// Return measured from an optional anchor observation.
///
/// A missing anchor or an anchor without a price is unavailable.
pub fn return_from_anchor(anchor: Option<&PricePoint>, latest: Money) -> TrailingReturn {
    match anchor.and_then(|p| p.adjusted_close) {
        Some(price) => percent_return(price, latest),
        None => TrailingReturn::NotAvailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    #[test]
    fn test_ten_percent_gain() {
        assert_eq!(percent_return(dec!(110), dec!(121)), TrailingReturn::Percent(dec!(10)));
    }

    #[test]
    fn test_loss() {
        assert_eq!(percent_return(dec!(200), dec!(150)), TrailingReturn::Percent(dec!(-25)));
    }

    #[test]
    fn test_flat_is_zero_not_unavailable() {
        assert_eq!(percent_return(dec!(42), dec!(42)), TrailingReturn::Percent(Decimal::ZERO));
    }

    #[test]
    fn test_zero_anchor_is_unavailable() {
        assert_eq!(percent_return(Decimal::ZERO, dec!(121)), TrailingReturn::NotAvailable);
    }

    #[test]
    fn test_overflow_is_unavailable() {
        assert_eq!(
            percent_return(dec!(0.0000000000000000000000000001), Decimal::MAX),
            TrailingReturn::NotAvailable
        );
    }

    #[test]
    fn test_missing_anchor() {
        assert_eq!(return_from_anchor(None, dec!(10)), TrailingReturn::NotAvailable);
        let unpriced = PricePoint::new("A", NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), None);
        assert_eq!(return_from_anchor(Some(&unpriced), dec!(10)), TrailingReturn::NotAvailable);
    }
}
