// Copyright (c) The github-activity-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ISO calendar-week arithmetic.
//!
//! Everything here is pure except [`IsoWeek::current`], which reads the wall
//! clock. All other week logic is a function of its inputs so the aggregation
//! pipeline stays independently testable.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeekParseError {
    #[error("malformed week label '{0}': expected YYYY-Www")]
    Malformed(String),
    #[error("week {week} out of range for year {year}")]
    OutOfRange { year: i32, week: u32 },
}

/// A calendar week per ISO-8601: year plus week number 1..=53.
///
/// Ordered by (year, week), which for the supported year range matches the
/// lexicographic order of the `YYYY-Www` label form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IsoWeek {
    year: i32,
    week: u32,
}

impl IsoWeek {
    /// Construct a week, validating the week number against the universal
    /// 1..=53 bound. Whether a given year actually has 53 weeks is checked by
    /// [`IsoWeek::successor`], not here: the upstream dashboard sends labels
    /// like `2024-W53` and those must still parse and step correctly.
    pub fn new(year: i32, week: u32) -> Result<Self, WeekParseError> {
        if !(1..=9999).contains(&year) || week == 0 || week > 53 {
            return Err(WeekParseError::OutOfRange { year, week });
        }
        Ok(Self { year, week })
    }

    /// Parse a `YYYY-Www` label.
    pub fn parse(label: &str) -> Result<Self, WeekParseError> {
        let malformed = || WeekParseError::Malformed(label.to_string());
        let (year_part, week_part) = label.split_once("-W").ok_or_else(malformed)?;
        let year: i32 = year_part.parse().map_err(|_| malformed())?;
        let week: u32 = week_part.parse().map_err(|_| malformed())?;
        Self::new(year, week)
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn week(self) -> u32 {
        self.week
    }

    /// The week containing the current moment. The single impurity boundary
    /// of the week logic.
    pub fn current() -> Self {
        let today = Utc::now().date_naive().iso_week();
        Self {
            year: today.year(),
            week: today.week(),
        }
    }

    /// The next ISO week, rolling into week 1 of the next year past the last
    /// valid week (52 or 53).
    pub fn successor(self) -> Self {
        let next = self.week + 1;
        if next > last_week_of_year(self.year) {
            Self {
                year: self.year + 1,
                week: 1,
            }
        } else {
            Self {
                year: self.year,
                week: next,
            }
        }
    }

    /// The previous ISO week, rolling into the last week of the prior year.
    pub fn predecessor(self) -> Self {
        if self.week == 1 {
            Self {
                year: self.year - 1,
                week: last_week_of_year(self.year - 1),
            }
        } else {
            Self {
                year: self.year,
                week: self.week - 1,
            }
        }
    }

    /// Step back `n` weeks.
    pub fn minus_weeks(self, n: u32) -> Self {
        let mut current = self;
        for _ in 0..n {
            current = current.predecessor();
        }
        current
    }

    /// The Monday that begins this week. ISO rule: week 1 always contains
    /// Jan-4, so anchor on the Monday of the week containing Jan-4.
    pub fn monday(self) -> NaiveDate {
        let jan4 =
            NaiveDate::from_ymd_opt(self.year, 1, 4).expect("year validated at construction");
        let week1_monday = jan4 - Duration::days(jan4.weekday().num_days_from_monday() as i64);
        week1_monday + Duration::days(((self.week - 1) * 7) as i64)
    }

    /// The first instant after this week, as a date: `monday + 7 days`.
    pub fn end_exclusive(self) -> NaiveDate {
        self.monday() + Duration::days(7)
    }
}

impl fmt::Display for IsoWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

/// The last valid ISO week of a year: 53 iff Dec-31 falls in ISO week 53.
pub fn last_week_of_year(year: i32) -> u32 {
    let dec31 = NaiveDate::from_ymd_opt(year, 12, 31).expect("Dec 31 exists for every year");
    if dec31.iso_week().week() == 53 { 53 } else { 52 }
}

/// The ordered sequence of weeks from `start` through `end`, inclusive on both
/// ends. Empty when `start > end`.
pub fn range(start: IsoWeek, end: IsoWeek) -> Vec<IsoWeek> {
    let mut weeks = Vec::new();
    let mut current = start;
    while current <= end {
        weeks.push(current);
        current = current.successor();
    }
    weeks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn week(label: &str) -> IsoWeek {
        IsoWeek::parse(label).unwrap()
    }

    #[test]
    fn test_parse_format_roundtrip() {
        for label in ["2026-W05", "2024-W53", "2020-W01", "1999-W52"] {
            let parsed = IsoWeek::parse(label).unwrap();
            assert_eq!(parsed.to_string(), label);
            assert_eq!(IsoWeek::parse(&parsed.to_string()).unwrap(), parsed);
        }
    }

    #[test]
    fn test_parse_zero_pads() {
        assert_eq!(week("2026-W5"), week("2026-W05"));
        assert_eq!(week("2026-W5").to_string(), "2026-W05");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for label in ["2026W05", "2026-05", "abcd-W05", "2026-Wxx", "", "-W05"] {
            assert!(matches!(
                IsoWeek::parse(label),
                Err(WeekParseError::Malformed(_))
            ));
        }
        for label in ["2026-W00", "2026-W54", "0-W01"] {
            assert!(matches!(
                IsoWeek::parse(label),
                Err(WeekParseError::OutOfRange { .. })
            ));
        }
    }

    #[test]
    fn test_last_week_of_year() {
        // 2020 and 2026 start on Wednesday (leap) and Thursday: long years.
        assert_eq!(last_week_of_year(2020), 53);
        assert_eq!(last_week_of_year(2026), 53);
        assert_eq!(last_week_of_year(2024), 52);
        assert_eq!(last_week_of_year(2025), 52);
    }

    #[test]
    fn test_successor_within_year() {
        assert_eq!(week("2026-W05").successor(), week("2026-W06"));
    }

    #[test]
    fn test_successor_rolls_over_year_end() {
        assert_eq!(week("2025-W52").successor(), week("2026-W01"));
        // Long year keeps going to W53 first.
        assert_eq!(week("2020-W52").successor(), week("2020-W53"));
        assert_eq!(week("2020-W53").successor(), week("2021-W01"));
    }

    #[test]
    fn test_successor_normalizes_overlong_label() {
        // 2024 has 52 weeks; the label still parses and steps into 2025.
        assert_eq!(week("2024-W53").successor(), week("2025-W01"));
    }

    #[test]
    fn test_predecessor_and_minus_weeks() {
        assert_eq!(week("2026-W01").predecessor(), week("2025-W52"));
        assert_eq!(week("2021-W01").predecessor(), week("2020-W53"));
        assert_eq!(week("2026-W02").minus_weeks(4), week("2025-W50"));
        assert_eq!(week("2026-W10").minus_weeks(0), week("2026-W10"));
    }

    #[test]
    fn test_monday() {
        // 2026-01-01 is a Thursday, so week 1 starts the prior Monday.
        let monday = week("2026-W01").monday();
        assert_eq!(monday, NaiveDate::from_ymd_opt(2025, 12, 29).unwrap());
        assert_eq!(monday.weekday(), Weekday::Mon);

        assert_eq!(
            week("2020-W53").monday(),
            NaiveDate::from_ymd_opt(2020, 12, 28).unwrap()
        );
    }

    #[test]
    fn test_end_exclusive() {
        let w = week("2026-W01");
        assert_eq!(w.end_exclusive() - w.monday(), Duration::days(7));
    }

    #[test]
    fn test_range_inclusive_and_increasing() {
        let weeks = range(week("2026-W01"), week("2026-W05"));
        assert_eq!(weeks.len(), 5);
        assert!(weeks.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(weeks[0], week("2026-W01"));
        assert_eq!(weeks[4], week("2026-W05"));
    }

    #[test]
    fn test_range_crosses_long_year() {
        let weeks = range(week("2020-W52"), week("2021-W01"));
        assert_eq!(
            weeks,
            vec![week("2020-W52"), week("2020-W53"), week("2021-W01")]
        );
    }

    #[test]
    fn test_range_empty_when_start_after_end() {
        assert!(range(week("2026-W05"), week("2026-W01")).is_empty());
        assert!(range(week("2027-W01"), week("2026-W52")).is_empty());
    }
}
