use super::window::{percentage_change, simple_moving_average};
use crate::series::{DateRange, ObservationSeries, Timestamp};
use chrono::Duration;
use log::debug;
use serde::Serialize;

/// Default trailing window for the short moving average
pub const DEFAULT_SHORT_WINDOW: usize = 5;

/// Default trailing window for the long moving average
pub const DEFAULT_LONG_WINDOW: usize = 10;

/// Row count of the legacy "24h" summary, assuming 5-minute sampling
pub const LEGACY_SUMMARY_ROWS: usize = 288;

/// Which observations feed the summary block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryWindow {
    /// Everything within this duration of the latest timestamp, inclusive
    Trailing(Duration),
    /// The last `n` observations regardless of spacing
    LastRows(usize),
}

impl Default for SummaryWindow {
    fn default() -> Self {
        SummaryWindow::Trailing(Duration::hours(24))
    }
}

impl SummaryWindow {
    /// Short description for the summary block, e.g. "24h"
    pub fn label(&self) -> String {
        match self {
            SummaryWindow::Trailing(duration) if duration.num_minutes() % 60 == 0 => {
                format!("{}h", duration.num_hours())
            }
            SummaryWindow::Trailing(duration) => format!("{}min", duration.num_minutes()),
            SummaryWindow::LastRows(rows) => format!("last {} readings", rows),
        }
    }
}

/// One observation with its derived metrics
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct DerivedPoint {
    pub timestamp: Timestamp,
    pub value: f64,
    /// Short trailing mean, `None` during warm-up
    pub sma_short: Option<f64>,
    /// Long trailing mean, `None` during warm-up
    pub sma_long: Option<f64>,
    /// Percent change from the previous point, `None` for the first point
    /// and after a zero value
    pub pct_change: Option<f64>,
}

/// Series augmented with moving averages and percentage variation
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DerivedSeries {
    pub short_window: usize,
    pub long_window: usize,
    pub points: Vec<DerivedPoint>,
}

impl DerivedSeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn latest(&self) -> Option<&DerivedPoint> {
        self.points.last()
    }
}

/// Latest value and extremes over the summary window
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Summary {
    pub latest: f64,
    pub max: f64,
    pub min: f64,
    pub mean: f64,
    /// Number of observations the summary was computed over
    pub points: usize,
    pub window_start: Timestamp,
    pub window_end: Timestamp,
}

/// Derives moving averages, percentage change and the trailing summary
///
/// Stateless: every call recomputes from the series it is given.
#[derive(Debug, Clone)]
pub struct MetricsEngine {
    short_window: usize,
    long_window: usize,
    summary_window: SummaryWindow,
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self::new(
            DEFAULT_SHORT_WINDOW,
            DEFAULT_LONG_WINDOW,
            SummaryWindow::default(),
        )
    }
}

impl MetricsEngine {
    /// Create an engine with explicit window sizes
    ///
    /// # Arguments
    ///
    /// * `short_window` - Points in the short moving average
    /// * `long_window` - Points in the long moving average
    /// * `summary_window` - Observations covered by the summary block
    pub fn new(short_window: usize, long_window: usize, summary_window: SummaryWindow) -> Self {
        Self {
            short_window,
            long_window,
            summary_window,
        }
    }

    pub fn short_window(&self) -> usize {
        self.short_window
    }

    pub fn long_window(&self) -> usize {
        self.long_window
    }

    pub fn summary_window(&self) -> SummaryWindow {
        self.summary_window
    }

    /// Compute derived metrics and the summary, after optional date filtering
    ///
    /// An empty (or fully filtered out) series yields an empty `DerivedSeries`
    /// and no summary.
    pub fn compute(
        &self,
        series: &ObservationSeries,
        range: Option<&DateRange>,
    ) -> (DerivedSeries, Option<Summary>) {
        let filtered;
        let series = match range {
            Some(range) => {
                filtered = series.filter_range(range);
                debug!(
                    "Date range {} to {} kept {} of {} observations",
                    range.start(),
                    range.end(),
                    filtered.len(),
                    series.len()
                );
                &filtered
            }
            None => series,
        };

        let values = series.values();
        let sma_short = simple_moving_average(&values, self.short_window);
        let sma_long = simple_moving_average(&values, self.long_window);
        let pct_change = percentage_change(&values);

        let points = series
            .iter()
            .enumerate()
            .map(|(i, obs)| DerivedPoint {
                timestamp: obs.timestamp,
                value: obs.value,
                sma_short: sma_short[i],
                sma_long: sma_long[i],
                pct_change: pct_change[i],
            })
            .collect();

        let derived = DerivedSeries {
            short_window: self.short_window,
            long_window: self.long_window,
            points,
        };

        (derived, self.summarize(series))
    }

    /// Summary over the configured window, `None` for an empty series
    pub fn summarize(&self, series: &ObservationSeries) -> Option<Summary> {
        let observations = series.observations();
        let latest = observations.last()?;

        let start = match self.summary_window {
            SummaryWindow::Trailing(duration) => {
                // A window reaching past the earliest representable time covers everything
                match latest.timestamp.checked_sub_signed(duration) {
                    Some(cutoff) => observations.partition_point(|obs| obs.timestamp < cutoff),
                    None => 0,
                }
            }
            SummaryWindow::LastRows(rows) => observations.len().saturating_sub(rows.max(1)),
        };
        let window = &observations[start..];

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for obs in window {
            min = min.min(obs.value);
            max = max.max(obs.value);
            sum += obs.value;
        }

        Some(Summary {
            latest: latest.value,
            max,
            min,
            mean: sum / window.len() as f64,
            points: window.len(),
            window_start: window[0].timestamp,
            window_end: latest.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{Observation, TIMESTAMP_FORMAT};
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(raw: &str) -> Timestamp {
        NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).unwrap()
    }

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    /// Series sampled every `step` minutes starting at 2025-03-01 00:00
    fn sampled(values: &[f64], step: i64) -> ObservationSeries {
        let base = ts("2025-03-01 00:00:00");
        ObservationSeries::from_unsorted(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| Observation::new(base + Duration::minutes(i as i64 * step), v))
                .collect(),
        )
    }

    #[test]
    fn test_moving_average_warm_up() {
        let values: Vec<f64> = (1..=12).map(|v| v as f64).collect();
        let (derived, _) = MetricsEngine::default().compute(&sampled(&values, 5), None);

        assert_eq!(derived.len(), 12);
        for (i, point) in derived.points.iter().enumerate() {
            if i < 4 {
                assert!(point.sma_short.is_none(), "sma_short[{}] should be undefined", i);
            } else {
                let expected = values[i - 4..=i].iter().sum::<f64>() / 5.0;
                assert!((point.sma_short.unwrap() - expected).abs() < 1e-9);
            }
            if i < 9 {
                assert!(point.sma_long.is_none(), "sma_long[{}] should be undefined", i);
            } else {
                let expected = values[i - 9..=i].iter().sum::<f64>() / 10.0;
                assert!((point.sma_long.unwrap() - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_pct_change_points() {
        let (derived, _) = MetricsEngine::default().compute(&sampled(&[20.0, 22.0, 0.0, 5.0], 5), None);

        assert_eq!(derived.points[0].pct_change, None);
        assert!((derived.points[1].pct_change.unwrap() - 10.0).abs() < 1e-9);
        assert!((derived.points[2].pct_change.unwrap() + 100.0).abs() < 1e-9);
        assert_eq!(derived.points[3].pct_change, None);
    }

    #[test]
    fn test_single_day_range_filter() {
        let series = ObservationSeries::from_unsorted(vec![
            Observation::new(ts("2025-03-01 16:00:00"), 10.0),
            Observation::new(ts("2025-03-02 16:00:00"), 20.0),
            Observation::new(ts("2025-03-03 16:00:00"), 30.0),
        ]);
        let range = DateRange::new(date("2025-03-02"), date("2025-03-02")).unwrap();

        let (derived, summary) = MetricsEngine::default().compute(&series, Some(&range));

        assert_eq!(derived.len(), 1);
        assert_eq!(derived.points[0].timestamp, ts("2025-03-02 16:00:00"));
        assert_eq!(derived.points[0].value, 20.0);
        assert_eq!(derived.points[0].pct_change, None);

        let summary = summary.unwrap();
        assert_eq!(summary.latest, 20.0);
        assert_eq!(summary.max, 20.0);
        assert_eq!(summary.min, 20.0);
        assert_eq!(summary.mean, 20.0);
        assert_eq!(summary.points, 1);
    }

    #[test]
    fn test_range_without_matches_is_empty() {
        let series = sampled(&[10.0, 20.0], 5);
        let range = DateRange::new(date("2030-01-01"), date("2030-01-02")).unwrap();

        let (derived, summary) = MetricsEngine::default().compute(&series, Some(&range));

        assert!(derived.is_empty());
        assert!(summary.is_none());
    }

    #[test]
    fn test_empty_series() {
        let (derived, summary) = MetricsEngine::default().compute(&ObservationSeries::new(), None);

        assert!(derived.is_empty());
        assert!(derived.latest().is_none());
        assert!(summary.is_none());
    }

    #[test]
    fn test_trailing_summary_uses_timestamps() {
        // Hourly samples over two days: only the last 24h plus the boundary point count
        let values: Vec<f64> = (0..48).map(|v| v as f64).collect();
        let series = sampled(&values, 60);

        let summary = MetricsEngine::default().summarize(&series).unwrap();

        assert_eq!(summary.points, 25);
        assert_eq!(summary.latest, 47.0);
        assert_eq!(summary.min, 23.0);
        assert_eq!(summary.max, 47.0);
        assert!((summary.mean - 35.0).abs() < 1e-9);
        assert_eq!(summary.window_start, ts("2025-03-01 23:00:00"));
        assert_eq!(summary.window_end, ts("2025-03-02 23:00:00"));
    }

    #[test]
    fn test_oversized_trailing_window_covers_whole_series() {
        let series = sampled(&[12.0, 18.0, 24.0], 60);
        let window = SummaryWindow::Trailing(Duration::days(365 * 1_000_000));
        let engine = MetricsEngine::new(5, 10, window);

        let summary = engine.summarize(&series).unwrap();

        assert_eq!(summary.points, 3);
        assert_eq!(summary.min, 12.0);
        assert_eq!(summary.window_start, ts("2025-03-01 00:00:00"));
    }

    #[test]
    fn test_legacy_row_summary() {
        let values: Vec<f64> = (0..300).map(|v| v as f64).collect();
        let engine = MetricsEngine::new(5, 10, SummaryWindow::LastRows(LEGACY_SUMMARY_ROWS));

        let summary = engine.summarize(&sampled(&values, 5)).unwrap();

        assert_eq!(summary.points, 288);
        assert_eq!(summary.min, 12.0);
        assert_eq!(summary.max, 299.0);
    }

    #[test]
    fn test_row_summary_shorter_than_window() {
        let engine = MetricsEngine::new(5, 10, SummaryWindow::LastRows(LEGACY_SUMMARY_ROWS));
        let summary = engine.summarize(&sampled(&[12.0, 18.0, 30.0], 5)).unwrap();

        assert_eq!(summary.points, 3);
        assert_eq!(summary.latest, 30.0);
        assert_eq!(summary.min, 12.0);
        assert_eq!(summary.max, 30.0);
        assert!((summary.mean - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_follows_range_filter() {
        let series = ObservationSeries::from_unsorted(vec![
            Observation::new(ts("2025-03-01 10:00:00"), 40.0),
            Observation::new(ts("2025-03-02 09:00:00"), 15.0),
            Observation::new(ts("2025-03-02 10:00:00"), 17.0),
        ]);
        let range = DateRange::new(date("2025-03-02"), date("2025-03-02")).unwrap();

        let (_, summary) = MetricsEngine::default().compute(&series, Some(&range));
        let summary = summary.unwrap();

        assert_eq!(summary.max, 17.0);
        assert_eq!(summary.points, 2);
    }

    #[test]
    fn test_summary_window_labels() {
        assert_eq!(SummaryWindow::default().label(), "24h");
        assert_eq!(SummaryWindow::Trailing(Duration::minutes(90)).label(), "90min");
        assert_eq!(SummaryWindow::LastRows(288).label(), "last 288 readings");
    }

    #[test]
    fn test_custom_windows() {
        let engine = MetricsEngine::new(2, 3, SummaryWindow::default());
        let (derived, _) = engine.compute(&sampled(&[2.0, 4.0, 6.0], 5), None);

        assert_eq!(derived.short_window, 2);
        assert_eq!(derived.long_window, 3);
        assert_eq!(derived.points[1].sma_short, Some(3.0));
        assert_eq!(derived.points[2].sma_long, Some(4.0));
    }
}
