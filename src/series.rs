//! Core observation types for the volatility dashboard
//!
//! This module defines the time series read from the observations file and
//! the inclusive date range used to restrict it.

use crate::error::DashboardError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Timestamp type for observations; the file carries no timezone
pub type Timestamp = NaiveDateTime;

/// Canonical timestamp layout used when writing observations
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Layouts accepted when reading observations, tried in order
const ACCEPTED_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// A single sample of the monitored index
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    /// When the sample was taken
    pub timestamp: Timestamp,
    /// Index value in points
    pub value: f64,
}

impl Observation {
    pub fn new(timestamp: Timestamp, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Observations ordered ascending by timestamp
///
/// Construction always sorts, so callers never rely on the on-disk order.
/// Duplicate timestamps are kept in their original relative order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObservationSeries {
    observations: Vec<Observation>,
}

impl ObservationSeries {
    /// Create an empty series
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from observations in any order
    pub fn from_unsorted(mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|obs| obs.timestamp);
        Self { observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.observations.iter()
    }

    /// Values in timestamp order
    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|obs| obs.value).collect()
    }

    /// Most recent observation, if any
    pub fn latest(&self) -> Option<&Observation> {
        self.observations.last()
    }

    /// Keep only observations whose calendar date falls inside `range`
    pub fn filter_range(&self, range: &DateRange) -> ObservationSeries {
        Self {
            observations: self
                .observations
                .iter()
                .filter(|obs| range.contains(&obs.timestamp))
                .copied()
                .collect(),
        }
    }
}

impl From<Vec<Observation>> for ObservationSeries {
    fn from(observations: Vec<Observation>) -> Self {
        Self::from_unsorted(observations)
    }
}

/// Parse a timestamp field from the observations file
///
/// Accepts `YYYY-MM-DD HH:MM:SS` (optionally with fractional seconds or a `T`
/// separator), `YYYY-MM-DD HH:MM`, RFC 3339 with an offset (converted to UTC)
/// and a bare `YYYY-MM-DD`, which maps to midnight.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for format in ACCEPTED_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Inclusive calendar-date range used to restrict the series
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range; `start` must not be after `end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DashboardError> {
        if start > end {
            return Err(DashboardError::InvalidRange(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse a range from two `YYYY-MM-DD` strings
    pub fn parse(start: &str, end: &str) -> Result<Self, DashboardError> {
        let parse = |label: &str, raw: &str| {
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
                DashboardError::InvalidRange(format!("{} date '{}': {}", label, raw, e))
            })
        };
        Self::new(parse("start", start)?, parse("end", end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Both bounds are inclusive and compared on the calendar date
    pub fn contains(&self, ts: &Timestamp) -> bool {
        let date = ts.date();
        date >= self.start && date <= self.end
    }
}
