//! Common types used throughout Resman RS

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive calendar date range.
///
/// All assignment windows are inclusive on both ends; there is no
/// time-of-day component anywhere in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    /// A range is well-formed when it covers at least one day.
    pub fn is_valid(&self) -> bool {
        self.end_date >= self.start_date
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

/// Whole months from the first day of `from`'s month to `to`'s month.
/// Negative when `to` is in an earlier month.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    use chrono::Datelike;
    (to.year() - from.year()) * 12 + (to.month() as i32 - from.month() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_range_validity() {
        assert!(DateRange::new(d(2024, 1, 1), d(2024, 6, 30)).is_valid());
        assert!(DateRange::new(d(2024, 1, 1), d(2024, 1, 1)).is_valid());
        assert!(!DateRange::new(d(2024, 6, 30), d(2024, 1, 1)).is_valid());
    }

    #[test]
    fn test_contains_is_inclusive() {
        let range = DateRange::new(d(2024, 1, 1), d(2024, 6, 30));
        assert!(range.contains(d(2024, 1, 1)));
        assert!(range.contains(d(2024, 6, 30)));
        assert!(range.contains(d(2024, 3, 15)));
        assert!(!range.contains(d(2023, 12, 31)));
        assert!(!range.contains(d(2024, 7, 1)));
    }

    #[test]
    fn test_duration() {
        assert_eq!(DateRange::new(d(2024, 1, 1), d(2024, 1, 1)).duration_days(), 0);
        assert_eq!(DateRange::new(d(2024, 1, 1), d(2024, 1, 31)).duration_days(), 30);
    }

    #[test]
    fn test_months_between() {
        assert_eq!(months_between(d(2024, 1, 1), d(2024, 1, 31)), 0);
        assert_eq!(months_between(d(2024, 1, 1), d(2024, 3, 2)), 2);
        assert_eq!(months_between(d(2023, 11, 15), d(2024, 2, 1)), 3);
        assert_eq!(months_between(d(2024, 3, 1), d(2024, 1, 15)), -2);
    }
}
