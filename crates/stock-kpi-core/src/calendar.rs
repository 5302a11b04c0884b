//! Calendar-year arithmetic on [`NaiveDate`].
//!
//! Subtracting whole years keeps the month and day. The only day that can
//! fail to exist in the target year is February 29; it is clamped to
//! February 28 when the target year is not a leap year. No date ever rolls
//! forward into March.

use chrono::{Datelike, NaiveDate};

/// Gregorian leap-year rule.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in a given month/year.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

/// Subtract `years` calendar years from `date`, clamping the day to the
/// target month's length.
///
/// Returns `None` when the result falls outside chrono's representable range.
pub fn subtract_years(date: NaiveDate, years: u32) -> Option<NaiveDate> {
    let years = i32::try_from(years).ok()?;
    let year = date.year().checked_sub(years)?;
    let day = date.day().min(days_in_month(year, date.month()));
    NaiveDate::from_ymd_opt(year, date.month(), day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_leap_years() {
        assert!(is_leap_year(2024));
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert!(!is_leap_year(2023));
    }

    #[test]
    fn test_plain_subtraction() {
        assert_eq!(subtract_years(d(2022, 1, 1), 1), Some(d(2021, 1, 1)));
        assert_eq!(subtract_years(d(2024, 7, 31), 5), Some(d(2019, 7, 31)));
    }

    #[test]
    fn test_leap_day_clamps_to_feb_28() {
        assert_eq!(subtract_years(d(2024, 2, 29), 1), Some(d(2023, 2, 28)));
        assert_eq!(subtract_years(d(2024, 2, 29), 3), Some(d(2021, 2, 28)));
        assert_eq!(subtract_years(d(2024, 2, 29), 5), Some(d(2019, 2, 28)));
    }

    #[test]
    fn test_leap_day_kept_in_leap_target_year() {
        assert_eq!(subtract_years(d(2024, 2, 29), 4), Some(d(2020, 2, 29)));
    }

    #[test]
    fn test_zero_years_is_identity() {
        assert_eq!(subtract_years(d(2024, 2, 29), 0), Some(d(2024, 2, 29)));
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(subtract_years(NaiveDate::MIN, 1), None);
        assert_eq!(subtract_years(d(2024, 1, 1), u32::MAX), None);
    }
}
