//! Calendar window used to filter statement rows by reporting date.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Accepted textual forms for the date column.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Inclusive daily range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for DateWindow {
    /// 2017-01-01 through 2022-03-31.
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2017, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2022, 3, 31).unwrap_or_default(),
        }
    }
}

impl DateWindow {
    /// `None` when `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// A timestamp is a member only if it is midnight of a day in the window.
    pub fn contains_day(&self, ts: NaiveDateTime) -> bool {
        ts.time() == NaiveTime::MIN && self.contains(ts.date())
    }
}

/// Parse a date or datetime value. Date-only values are taken as midnight.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .map(|d| d.and_time(NaiveTime::MIN))
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn default_window() {
        let w = DateWindow::default();
        assert_eq!(w.start, ymd(2017, 1, 1));
        assert_eq!(w.end, ymd(2022, 3, 31));
    }

    #[test]
    fn bounds_are_inclusive() {
        let w = DateWindow::default();
        assert!(w.contains(ymd(2017, 1, 1)));
        assert!(w.contains(ymd(2022, 3, 31)));
        assert!(!w.contains(ymd(2016, 12, 31)));
        assert!(!w.contains(ymd(2022, 4, 1)));
    }

    #[test]
    fn inverted_window_rejected() {
        assert!(DateWindow::new(ymd(2022, 1, 1), ymd(2021, 1, 1)).is_none());
        assert!(DateWindow::new(ymd(2022, 1, 1), ymd(2022, 1, 1)).is_some());
    }

    #[test]
    fn intraday_timestamps_are_not_days() {
        let w = DateWindow::default();
        assert!(w.contains_day(parse_timestamp("2019-06-30").unwrap()));
        assert!(w.contains_day(parse_timestamp("2019-06-30 00:00:00").unwrap()));
        assert!(!w.contains_day(parse_timestamp("2019-06-30 12:30:00").unwrap()));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("2019-02-30").is_none());
        assert!(parse_timestamp("").is_none());
    }

    proptest! {
        #[test]
        fn contains_day_matches_inclusive_bounds(offset in -400i64..2400) {
            let w = DateWindow::default();
            let date = w.start + chrono::Duration::days(offset);
            let ts = parse_timestamp(&date.format("%Y-%m-%d").to_string()).unwrap();
            let in_sequence = date >= w.start && date <= w.end;
            prop_assert_eq!(w.contains_day(ts), in_sequence);
        }
    }
}
