//! Day-resolution time indexing for the daily climate dataset.
//!
//! The remote dataset addresses days by an integer timestep. This crate uses
//! the number of days elapsed since [`EPOCH`] on the proleptic Gregorian
//! calendar, so leap years contribute 366 indices and the mapping is
//! injective, strictly monotonic and exactly invertible.

use chrono::{Days, NaiveDate};

use crate::error::{ValidationError, ValidationResult};

/// First day covered by the dataset (timestep 0).
pub const EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(1950, 1, 1) {
    Some(date) => date,
    None => panic!("invalid dataset epoch"),
};

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(s.to_string()))
}

/// Convert a calendar date to its timestep index.
pub fn date_to_timestep(date: NaiveDate) -> ValidationResult<i64> {
    if date < EPOCH {
        return Err(ValidationError::DateBeforeEpoch(date));
    }
    Ok((date - EPOCH).num_days())
}

/// Convert a timestep index back to its calendar date.
///
/// Returns `None` for negative indices or indices past chrono's range.
pub fn timestep_to_date(timestep: i64) -> Option<NaiveDate> {
    let days = u64::try_from(timestep).ok()?;
    EPOCH.checked_add_days(Days::new(days))
}

/// Dates from `start` to `end` stepped by `step_days`.
///
/// The requested `end` is always the last element, even when the step does
/// not land on it exactly.
pub fn date_range(start: NaiveDate, end: NaiveDate, step_days: i64) -> ValidationResult<Vec<NaiveDate>> {
    if end < start {
        return Err(ValidationError::invalid_request(
            "end_time must be on/after start_time",
        ));
    }
    if step_days <= 0 {
        return Err(ValidationError::invalid_request(
            "step_days must be a positive integer",
        ));
    }

    let step = Days::new(step_days as u64);
    let mut dates = Vec::new();
    let mut current = Some(start);
    while let Some(date) = current.filter(|d| *d <= end) {
        dates.push(date);
        current = date.checked_add_days(step);
    }

    if dates.last() != Some(&end) {
        dates.push(end);
    }

    Ok(dates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_epoch_is_zero() {
        assert_eq!(date_to_timestep(EPOCH).unwrap(), 0);
        assert_eq!(timestep_to_date(0), Some(EPOCH));
    }

    #[test]
    fn test_known_timestep() {
        assert_eq!(date_to_timestep(ymd(1999, 12, 20)).unwrap(), 18250);
        assert_eq!(timestep_to_date(18250), Some(ymd(1999, 12, 20)));
    }

    #[test]
    fn test_leap_day_gets_its_own_index() {
        let feb28 = date_to_timestep(ymd(2000, 2, 28)).unwrap();
        let feb29 = date_to_timestep(ymd(2000, 2, 29)).unwrap();
        let mar01 = date_to_timestep(ymd(2000, 3, 1)).unwrap();
        assert_eq!(feb29, feb28 + 1);
        assert_eq!(mar01, feb29 + 1);

        // 1952 is a leap year, 1950 and 1951 are not
        assert_eq!(date_to_timestep(ymd(1953, 1, 1)).unwrap(), 365 + 365 + 366);
    }

    #[test]
    fn test_before_epoch_rejected() {
        let err = date_to_timestep(ymd(1949, 12, 31)).unwrap_err();
        assert!(matches!(err, ValidationError::DateBeforeEpoch(_)));
        assert_eq!(timestep_to_date(-1), None);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2014-06-30").unwrap(), ymd(2014, 6, 30));
        assert_eq!(parse_date(" 2014-06-30 ").unwrap(), ymd(2014, 6, 30));
        assert!(matches!(
            parse_date("06/30/2014"),
            Err(ValidationError::InvalidDate(_))
        ));
        assert!(parse_date("2014-02-30").is_err());
    }

    #[test]
    fn test_date_range_appends_end() {
        let dates = date_range(ymd(1999, 1, 1), ymd(1999, 3, 1), 30).unwrap();
        assert_eq!(dates, vec![ymd(1999, 1, 1), ymd(1999, 1, 31), ymd(1999, 3, 1)]);
    }

    #[test]
    fn test_date_range_exact_landing() {
        let dates = date_range(ymd(2000, 1, 1), ymd(2000, 1, 5), 2).unwrap();
        assert_eq!(dates, vec![ymd(2000, 1, 1), ymd(2000, 1, 3), ymd(2000, 1, 5)]);
    }

    #[test]
    fn test_date_range_single_day() {
        let dates = date_range(ymd(2000, 1, 1), ymd(2000, 1, 1), 7).unwrap();
        assert_eq!(dates, vec![ymd(2000, 1, 1)]);
    }

    #[test]
    fn test_date_range_rejects_bad_input() {
        assert!(date_range(ymd(2000, 1, 2), ymd(2000, 1, 1), 1).is_err());
        assert!(date_range(ymd(2000, 1, 1), ymd(2000, 1, 2), 0).is_err());
        assert!(date_range(ymd(2000, 1, 1), ymd(2000, 1, 2), -3).is_err());
    }

    proptest! {
        #[test]
        fn prop_timestep_round_trips(days in 0i64..60_000) {
            let date = timestep_to_date(days).unwrap();
            prop_assert_eq!(date_to_timestep(date).unwrap(), days);
        }

        #[test]
        fn prop_timestep_is_strictly_monotonic(a in 0i64..60_000, gap in 1u64..5_000) {
            let earlier = timestep_to_date(a).unwrap();
            let later = earlier.checked_add_days(Days::new(gap)).unwrap();
            prop_assert!(date_to_timestep(later).unwrap() > date_to_timestep(earlier).unwrap());
        }

        #[test]
        fn prop_date_range_is_increasing_and_bounded(start in 0i64..50_000, span in 0i64..2_000, step in 1i64..90) {
            let s = timestep_to_date(start).unwrap();
            let e = timestep_to_date(start + span).unwrap();
            let dates = date_range(s, e, step).unwrap();
            prop_assert_eq!(dates.first().copied(), Some(s));
            prop_assert_eq!(dates.last().copied(), Some(e));
            prop_assert!(dates.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
