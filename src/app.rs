//! Application context for the dashboard
//!
//! `AppContext` is constructed once at startup and owns the configured
//! sources, metrics engine and classifier. Each call is one refresh tick:
//! it re-reads from disk and recomputes from scratch.

use crate::alerts::{AlertClassifier, AlertLevel};
use crate::config::Config;
use crate::error::{DashboardError, DataSourceError, ReportError};
use crate::metrics::MetricsEngine;
use crate::series::DateRange;
use crate::sources::{CsvDataSource, ObservationSource, ReportSource};
use crate::view::DashboardView;
use log::{debug, info};

pub struct AppContext {
    data: Box<dyn ObservationSource>,
    report: ReportSource,
    engine: MetricsEngine,
    classifier: AlertClassifier,
}

impl AppContext {
    /// Assemble a context from explicit parts
    pub fn new(
        data: Box<dyn ObservationSource>,
        report: ReportSource,
        engine: MetricsEngine,
        classifier: AlertClassifier,
    ) -> Self {
        Self {
            data,
            report,
            engine,
            classifier,
        }
    }

    /// Build the context described by `config`
    pub fn from_config(config: &Config) -> Self {
        info!(
            "Dashboard reading observations from {} and report from {}",
            config.data.path.display(),
            config.report.path.display()
        );
        Self::new(
            Box::new(CsvDataSource::new(config.data.path.clone())),
            ReportSource::new(config.report.path.clone()),
            config.metrics_engine(),
            config.classifier(),
        )
    }

    /// Run one data tick: load, filter, compute and classify
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::DataSource` only for I/O failures; a missing
    /// or malformed file produces the "No data available" view.
    pub fn dashboard(&self, range: Option<DateRange>) -> Result<DashboardView, DashboardError> {
        let series = self.data.load()?;
        let (derived, summary) = self.engine.compute(&series, range.as_ref());

        let view = DashboardView::build(
            &derived,
            summary.as_ref(),
            self.engine.summary_window(),
            &self.classifier,
            range,
        );

        debug!(
            "Data tick: {} observations loaded, {} plotted",
            series.len(),
            derived.len()
        );
        if let Some(badge) = view.alert.as_ref().filter(|b| b.level == AlertLevel::High) {
            info!("Latest reading {:.2} is {}", badge.value, badge.label);
        }

        Ok(view)
    }

    /// Run one report tick
    pub fn report(&self) -> Result<String, ReportError> {
        self.report.load()
    }

    /// Observations file for download, `None` if it does not exist yet
    pub fn raw_data(&self) -> Result<Option<Vec<u8>>, DataSourceError> {
        self.data.raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{Observation, ObservationSeries, TIMESTAMP_FORMAT};
    use crate::sources::data_source::MockObservationSource;
    use crate::sources::REPORT_PLACEHOLDER;
    use crate::view::NO_DATA_MESSAGE;
    use chrono::{NaiveDate, NaiveDateTime};
    use tempfile::TempDir;

    fn three_days() -> ObservationSeries {
        let ts = |raw: &str| NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).unwrap();
        ObservationSeries::from_unsorted(vec![
            Observation::new(ts("2025-03-01 16:00:00"), 10.0),
            Observation::new(ts("2025-03-02 16:00:00"), 20.0),
            Observation::new(ts("2025-03-03 16:00:00"), 30.0),
        ])
    }

    fn context_with(source: MockObservationSource, dir: &TempDir) -> AppContext {
        AppContext::new(
            Box::new(source),
            ReportSource::new(dir.path().join("daily_report.txt")),
            MetricsEngine::default(),
            AlertClassifier::default(),
        )
    }

    #[test]
    fn test_every_tick_reloads_the_source() {
        let dir = TempDir::new().unwrap();
        let mut source = MockObservationSource::new();
        source
            .expect_load()
            .times(2)
            .returning(|| Ok(three_days()));
        let app = context_with(source, &dir);

        let first = app.dashboard(None).unwrap();
        let second = app.dashboard(None).unwrap();

        assert_eq!(first.chart.values, vec![10.0, 20.0, 30.0]);
        assert_eq!(second.chart.values, first.chart.values);
        assert_eq!(first.alert.unwrap().level, AlertLevel::High);
    }

    #[test]
    fn test_range_restricts_view() {
        let dir = TempDir::new().unwrap();
        let mut source = MockObservationSource::new();
        source.expect_load().returning(|| Ok(three_days()));
        let app = context_with(source, &dir);

        let day = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        let range = DateRange::new(day, day).unwrap();
        let view = app.dashboard(Some(range)).unwrap();

        assert_eq!(view.chart.values, vec![20.0]);
        assert_eq!(view.range, Some(range));
        assert_eq!(view.alert.unwrap().level, AlertLevel::Moderate);
        let summary = view.summary.unwrap();
        assert_eq!(
            (summary.latest, summary.max, summary.min, summary.mean),
            (20.0, 20.0, 20.0, 20.0)
        );
    }

    #[test]
    fn test_empty_source_renders_fallback() {
        let dir = TempDir::new().unwrap();
        let mut source = MockObservationSource::new();
        source
            .expect_load()
            .returning(|| Ok(ObservationSeries::new()));
        let app = context_with(source, &dir);

        let view = app.dashboard(None).unwrap();

        assert_eq!(view.message.as_deref(), Some(NO_DATA_MESSAGE));
        assert!(view.summary.is_none());
        assert!(view.alert.is_none());
    }

    #[test]
    fn test_io_failure_is_surfaced() {
        let dir = TempDir::new().unwrap();
        let mut source = MockObservationSource::new();
        source.expect_load().returning(|| {
            Err(DataSourceError::Io {
                path: "vix_data.csv".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        });
        let app = context_with(source, &dir);

        assert!(matches!(
            app.dashboard(None),
            Err(DashboardError::DataSource(DataSourceError::Io { .. }))
        ));
    }

    #[test]
    fn test_report_tick() {
        let dir = TempDir::new().unwrap();
        let app = context_with(MockObservationSource::new(), &dir);

        assert_eq!(app.report().unwrap(), REPORT_PLACEHOLDER);

        std::fs::write(dir.path().join("daily_report.txt"), "Calm session.\n").unwrap();
        assert_eq!(app.report().unwrap(), "Calm session.\n");
    }

    #[test]
    fn test_raw_data_passthrough() {
        let dir = TempDir::new().unwrap();
        let mut source = MockObservationSource::new();
        source
            .expect_raw()
            .times(1)
            .returning(|| Ok(Some(b"2025-03-01 16:00:00,10\n".to_vec())));
        let app = context_with(source, &dir);

        assert_eq!(
            app.raw_data().unwrap(),
            Some(b"2025-03-01 16:00:00,10\n".to_vec())
        );
    }

    #[test]
    fn test_from_config_reads_configured_files() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data.path = dir.path().join("vix_data.csv");
        config.report.path = dir.path().join("daily_report.txt");
        std::fs::write(&config.data.path, "2025-03-01 16:00:00,25.5\n").unwrap();

        let app = AppContext::from_config(&config);
        let view = app.dashboard(None).unwrap();

        assert_eq!(view.chart.values, vec![25.5]);
        assert_eq!(view.alert.unwrap().level, AlertLevel::Moderate);
    }
}
