//! Core data types for the Astmon measurement store
//!
//! This module defines the fundamental types used throughout the storage layer:
//! - `Reading`: one line of an instrument log (no station metadata)
//! - `Measurement`: a stored reading tagged with position and filter
//! - `TimeInterval`: an inclusive wall-clock interval used for selection

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Wall-clock literal format used for interval endpoints
pub const INTERVAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single line of a sky-quality instrument log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    /// Observation time, UTC seconds since epoch
    pub timestamp: i64,
    /// Moon above the horizon during the exposure
    pub is_moon: bool,
    /// Photometric night-quality ratio
    pub photo_night: Option<f64>,
    /// Sky brightness in mag/arcsec²
    pub sky_bright: f64,
}

/// A stored sky-brightness measurement
///
/// Rows of the `measurement` table. The query layer treats these as read-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Measurement {
    /// Observation time, UTC seconds since epoch (`datetime_obs`)
    pub timestamp: i64,
    pub is_moon: bool,
    /// `None` when the stored column is NULL
    pub photo_night: Option<f64>,
    pub sky_bright: f64,
    /// Station identifier
    pub position: i64,
    /// Optical bandpass letter (B, V, R, I...)
    pub filter_name: String,
}

impl Measurement {
    /// Create a measurement with a known photo_night value
    pub fn new(
        timestamp: i64,
        photo_night: f64,
        sky_bright: f64,
        position: i64,
        filter_name: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            is_moon: false,
            photo_night: Some(photo_night),
            sky_bright,
            position,
            filter_name: filter_name.into(),
        }
    }

    /// Attach station metadata to a parsed reading
    pub fn from_reading(reading: Reading, position: i64, filter_name: impl Into<String>) -> Self {
        Self {
            timestamp: reading.timestamp,
            is_moon: reading.is_moon,
            photo_night: reading.photo_night,
            sky_bright: reading.sky_bright,
            position,
            filter_name: filter_name.into(),
        }
    }

    /// Builder method: set the moon flag
    pub fn moon(mut self, is_moon: bool) -> Self {
        self.is_moon = is_moon;
        self
    }

    /// Observation time as a UTC datetime
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp, 0)
    }
}

/// Inclusive time interval `[start, end]` in UTC wall-clock time
///
/// Both endpoints match. `start <= end` always holds for values built through
/// the constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeInterval {
    /// Create an interval, returning None if `start > end`
    pub fn try_new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        if start <= end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// 00:00:00 through 23:59:59 of one calendar day
    pub fn day(year: i32, month: u32, day: u32) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        Some(Self::span_days(date, date))
    }

    /// First through last day of a calendar month
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let last = NaiveDate::from_ymd_opt(year, month, days_in_month(year, month)?)?;
        Some(Self::span_days(first, last))
    }

    /// January 1 through December 31 of a year
    pub fn year(year: i32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, 1, 1)?;
        let last = NaiveDate::from_ymd_opt(year, 12, 31)?;
        Some(Self::span_days(first, last))
    }

    fn span_days(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            start: first.and_time(NaiveTime::MIN),
            end: last.and_time(end_of_day()),
        }
    }

    /// Start as UTC seconds since epoch
    pub fn start_epoch(&self) -> i64 {
        self.start.and_utc().timestamp()
    }

    /// End as UTC seconds since epoch
    pub fn end_epoch(&self) -> i64 {
        self.end.and_utc().timestamp()
    }

    /// Check if an epoch-seconds timestamp falls within this interval
    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start_epoch() && timestamp <= self.end_epoch()
    }
}

impl std::fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}]",
            self.start.format(INTERVAL_FORMAT),
            self.end.format(INTERVAL_FORMAT)
        )
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

/// Number of days in a calendar month, honoring leap years
///
/// Returns None for a month outside 1..=12.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    u32::try_from(next.signed_duration_since(first).num_days()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, INTERVAL_FORMAT).unwrap()
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2021, 2), Some(28));
        assert_eq!(days_in_month(2020, 2), Some(29));
        assert_eq!(days_in_month(1900, 2), Some(28));
        assert_eq!(days_in_month(2000, 2), Some(29));
        assert_eq!(days_in_month(2020, 4), Some(30));
        assert_eq!(days_in_month(2020, 12), Some(31));
        assert_eq!(days_in_month(2020, 13), None);
        assert_eq!(days_in_month(2020, 0), None);
    }

    #[test]
    fn test_interval_day() {
        let interval = TimeInterval::day(2020, 5, 1).unwrap();
        assert_eq!(interval.start, at("2020-05-01 00:00:00"));
        assert_eq!(interval.end, at("2020-05-01 23:59:59"));
        assert!(TimeInterval::day(2021, 2, 29).is_none());
    }

    #[test]
    fn test_interval_month_and_year() {
        let feb = TimeInterval::month(2020, 2).unwrap();
        assert_eq!(feb.end, at("2020-02-29 23:59:59"));

        let year = TimeInterval::year(2021).unwrap();
        assert_eq!(year.start, at("2021-01-01 00:00:00"));
        assert_eq!(year.end, at("2021-12-31 23:59:59"));
    }

    #[test]
    fn test_interval_contains_is_inclusive() {
        let interval = TimeInterval::day(2020, 5, 1).unwrap();
        let start = interval.start_epoch();
        let end = interval.end_epoch();

        assert_eq!(end - start, 86_399);
        assert!(!interval.contains(start - 1));
        assert!(interval.contains(start));
        assert!(interval.contains(end));
        assert!(!interval.contains(end + 1));
    }

    #[test]
    fn test_interval_rejects_reversed_bounds() {
        assert!(TimeInterval::try_new(at("2020-01-02 00:00:00"), at("2020-01-01 00:00:00")).is_none());
        assert!(TimeInterval::try_new(at("2020-01-01 00:00:00"), at("2020-01-01 00:00:00")).is_some());
    }

    #[test]
    fn test_interval_display() {
        let interval = TimeInterval::day(2020, 5, 1).unwrap();
        assert_eq!(
            interval.to_string(),
            "[2020-05-01 00:00:00, 2020-05-01 23:59:59]"
        );
    }

    #[test]
    fn test_measurement_from_reading() {
        let reading = Reading {
            timestamp: 1_588_302_125,
            is_moon: true,
            photo_night: Some(0.82),
            sky_bright: 20.4,
        };
        let m = Measurement::from_reading(reading, 2, "V");
        assert_eq!(m.position, 2);
        assert_eq!(m.filter_name, "V");
        assert!(m.is_moon);
        assert_eq!(
            m.datetime().unwrap().format(INTERVAL_FORMAT).to_string(),
            "2020-05-01 03:02:05"
        );
    }
}
