//! JSON view served to the dashboard page
//!
//! The page only draws what it is given: undefined metrics arrive as `null`
//! and are left as gaps, and an empty series arrives with a message instead
//! of chart data.

use crate::alerts::{AlertClassifier, AlertLevel};
use crate::metrics::{DerivedSeries, Summary, SummaryWindow};
use crate::series::{DateRange, Timestamp};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Message shown in place of the charts when there is nothing to plot
pub const NO_DATA_MESSAGE: &str = "No data available";

/// Everything the page renders for one data tick
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardView {
    pub generated_at: DateTime<Utc>,
    pub range: Option<DateRange>,
    /// Set when there is no data to plot
    pub message: Option<String>,
    pub chart: ChartSeries,
    pub variation: VariationSeries,
    pub alert: Option<AlertBadge>,
    pub summary: Option<SummaryView>,
}

/// Value line plus moving averages
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ChartSeries {
    pub timestamps: Vec<Timestamp>,
    pub values: Vec<f64>,
    pub sma_short: Vec<Option<f64>>,
    pub sma_long: Vec<Option<f64>>,
    pub short_window: usize,
    pub long_window: usize,
}

/// Bars of percentage change between consecutive readings
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct VariationSeries {
    pub timestamps: Vec<Timestamp>,
    pub pct_change: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AlertBadge {
    pub level: AlertLevel,
    pub label: String,
    pub color: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SummaryView {
    pub latest: f64,
    pub max: f64,
    pub min: f64,
    pub mean: f64,
    pub points: usize,
    pub window: String,
    pub text: String,
}

impl DashboardView {
    /// View for a tick with nothing to plot
    pub fn empty(range: Option<DateRange>) -> Self {
        Self {
            generated_at: Utc::now(),
            range,
            message: Some(NO_DATA_MESSAGE.to_string()),
            chart: ChartSeries::default(),
            variation: VariationSeries::default(),
            alert: None,
            summary: None,
        }
    }

    /// Assemble the view from computed metrics
    ///
    /// Falls back to [`DashboardView::empty`] when the derived series is empty.
    /// The badge is omitted if the latest value is not finite.
    pub fn build(
        derived: &DerivedSeries,
        summary: Option<&Summary>,
        window: SummaryWindow,
        classifier: &AlertClassifier,
        range: Option<DateRange>,
    ) -> Self {
        let latest = match derived.latest() {
            Some(point) => point.value,
            None => return Self::empty(range),
        };

        let timestamps: Vec<Timestamp> = derived.points.iter().map(|p| p.timestamp).collect();

        let chart = ChartSeries {
            timestamps: timestamps.clone(),
            values: derived.points.iter().map(|p| p.value).collect(),
            sma_short: derived.points.iter().map(|p| p.sma_short).collect(),
            sma_long: derived.points.iter().map(|p| p.sma_long).collect(),
            short_window: derived.short_window,
            long_window: derived.long_window,
        };

        let variation = VariationSeries {
            timestamps,
            pct_change: derived.points.iter().map(|p| p.pct_change).collect(),
        };

        let alert = latest.is_finite().then(|| {
            let level = classifier.classify(latest);
            AlertBadge {
                level,
                label: level.label().to_string(),
                color: level.color().to_string(),
                value: latest,
            }
        });

        Self {
            generated_at: Utc::now(),
            range,
            message: None,
            chart,
            variation,
            alert,
            summary: summary.map(|s| SummaryView::new(s, window)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chart.values.is_empty()
    }
}

impl SummaryView {
    fn new(summary: &Summary, window: SummaryWindow) -> Self {
        let label = window.label();
        let text = format!(
            "Latest: {:.2} | {label} max: {:.2} | {label} min: {:.2} | {label} mean: {:.2}",
            summary.latest,
            summary.max,
            summary.min,
            summary.mean,
            label = label
        );
        Self {
            latest: summary.latest,
            max: summary.max,
            min: summary.min,
            mean: summary.mean,
            points: summary.points,
            window: label,
            text,
        }
    }
}
