//! Dashboard configuration
//!
//! Loaded from a TOML file. Every field has a default, so an empty file (or
//! no file at all) yields the stock deployment: `vix_data.csv` and
//! `daily_report.txt` in the working directory, served on `0.0.0.0:8050`.

use crate::alerts::AlertClassifier;
use crate::error::ConfigError;
use crate::metrics::{MetricsEngine, SummaryWindow};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Routes owned by the server that the download path must not shadow
const RESERVED_PATHS: &[&str] = &["/", "/api/dashboard", "/api/report", "/health", "/healthz"];

/// Longest trailing summary window, one hundred years
pub const MAX_SUMMARY_HOURS: u64 = 24 * 365 * 100;

/// Longest refresh period; browser timers only hold a signed 32-bit millisecond delay
pub const MAX_REFRESH_SECS: u64 = i32::MAX as u64 / 1000;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub report: ReportConfig,
    pub server: ServerConfig,
    pub refresh: RefreshConfig,
    pub metrics: MetricsConfig,
    pub alerts: AlertsConfig,
}

/// Observations file settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    pub path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("vix_data.csv"),
        }
    }
}

/// Daily report settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    pub path: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("daily_report.txt"),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, e.g. "0.0.0.0:8050"
    pub bind: String,
    /// URL path serving the raw observations file
    pub download_path: String,
    /// Page heading
    pub title: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8050".to_string(),
            download_path: "/vix_data.csv".to_string(),
            title: "Volatility Index - The Fear Gauge".to_string(),
        }
    }
}

/// Browser refresh periods
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RefreshConfig {
    pub data_secs: u64,
    pub report_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            data_secs: 5 * 60,
            report_secs: 60 * 60,
        }
    }
}

/// Moving average and summary windows
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    pub short_window: usize,
    pub long_window: usize,
    /// Trailing duration covered by the summary
    pub summary_hours: u64,
    /// When set, summarize the last N rows instead of a trailing duration
    pub summary_rows: Option<usize>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            short_window: crate::metrics::engine::DEFAULT_SHORT_WINDOW,
            long_window: crate::metrics::engine::DEFAULT_LONG_WINDOW,
            summary_hours: 24,
            summary_rows: None,
        }
    }
}

/// Alert tier boundaries
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlertsConfig {
    pub moderate: f64,
    pub high: f64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            moderate: crate::alerts::classifier::DEFAULT_MODERATE_THRESHOLD,
            high: crate::alerts::classifier::DEFAULT_HIGH_THRESHOLD,
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    ///
    /// # Errors
    ///
    /// * `ConfigError::ReadError` if the file does not exist
    /// * `ConfigError::IoError` if it exists but cannot be read
    /// * `ConfigError::TomlError` if it is not valid TOML for this schema
    /// * `ConfigError::ValidationError` if a value is out of range
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                ConfigError::ReadError(format!("{}: {}", path.display(), e))
            }
            _ => ConfigError::IoError(e),
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metrics.short_window == 0 || self.metrics.long_window == 0 {
            return Err(ConfigError::ValidationError(
                "metrics.short_window and metrics.long_window must be greater than 0".to_string(),
            ));
        }
        if self.metrics.summary_hours == 0 || self.metrics.summary_hours > MAX_SUMMARY_HOURS {
            return Err(ConfigError::ValidationError(format!(
                "metrics.summary_hours must be between 1 and {}",
                MAX_SUMMARY_HOURS
            )));
        }
        if self.metrics.summary_rows == Some(0) {
            return Err(ConfigError::ValidationError(
                "metrics.summary_rows must be greater than 0 when set".to_string(),
            ));
        }
        let periods = [self.refresh.data_secs, self.refresh.report_secs];
        if periods.iter().any(|&secs| secs == 0 || secs > MAX_REFRESH_SECS) {
            return Err(ConfigError::ValidationError(format!(
                "refresh periods must be between 1 and {} seconds",
                MAX_REFRESH_SECS
            )));
        }
        if !self.alerts.moderate.is_finite() || !self.alerts.high.is_finite() {
            return Err(ConfigError::ValidationError(
                "alert thresholds must be finite".to_string(),
            ));
        }
        if self.alerts.moderate >= self.alerts.high {
            return Err(ConfigError::ValidationError(format!(
                "alerts.moderate ({}) must be below alerts.high ({})",
                self.alerts.moderate, self.alerts.high
            )));
        }
        self.bind_addr()?;
        let download = self.server.download_path.as_str();
        if !download.starts_with('/') || RESERVED_PATHS.contains(&download) {
            return Err(ConfigError::ValidationError(format!(
                "server.download_path '{}' must start with '/' and not shadow a built-in route",
                download
            )));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.bind.parse().map_err(|e| {
            ConfigError::ValidationError(format!("server.bind '{}': {}", self.server.bind, e))
        })
    }

    pub fn summary_window(&self) -> SummaryWindow {
        match self.metrics.summary_rows {
            Some(rows) => SummaryWindow::LastRows(rows),
            None => SummaryWindow::Trailing(chrono::Duration::hours(
                self.metrics.summary_hours.min(MAX_SUMMARY_HOURS) as i64,
            )),
        }
    }

    pub fn metrics_engine(&self) -> MetricsEngine {
        MetricsEngine::new(
            self.metrics.short_window,
            self.metrics.long_window,
            self.summary_window(),
        )
    }

    pub fn classifier(&self) -> AlertClassifier {
        AlertClassifier::new(self.alerts.moderate, self.alerts.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_stock_deployment() {
        let config = Config::default();

        assert_eq!(config.data.path, PathBuf::from("vix_data.csv"));
        assert_eq!(config.report.path, PathBuf::from("daily_report.txt"));
        assert_eq!(config.bind_addr().unwrap().port(), 8050);
        assert_eq!(config.server.download_path, "/vix_data.csv");
        assert_eq!(config.refresh.data_secs, 300);
        assert_eq!(config.refresh.report_secs, 3600);
        assert_eq!(
            config.summary_window(),
            SummaryWindow::Trailing(chrono::Duration::hours(24))
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = Config::from_toml_str(
            r#"
            [data]
            path = "/srv/vix/vix_data.csv"

            [server]
            bind = "127.0.0.1:9000"

            [metrics]
            summary_rows = 288

            [alerts]
            moderate = 18.0
            "#,
        )
        .unwrap();

        assert_eq!(config.data.path, PathBuf::from("/srv/vix/vix_data.csv"));
        assert_eq!(config.bind_addr().unwrap().port(), 9000);
        assert_eq!(config.summary_window(), SummaryWindow::LastRows(288));
        assert_eq!(config.alerts.moderate, 18.0);
        assert_eq!(config.alerts.high, 30.0);
        assert_eq!(config.report, ReportConfig::default());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[refresh]\ndata_secs = 60\n").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.refresh.data_secs, 60);
        assert_eq!(config.refresh.report_secs, 3600);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let result = Config::from_file(Path::new("/nonexistent/fear-gauge.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }

    #[test]
    fn test_unreadable_path_is_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = Config::from_file(dir.path());
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_refresh_and_summary_upper_bounds_are_accepted() {
        let raw = format!(
            "[refresh]\ndata_secs = {0}\nreport_secs = {0}\n[metrics]\nsummary_hours = {1}",
            MAX_REFRESH_SECS, MAX_SUMMARY_HOURS
        );
        let config = Config::from_toml_str(&raw).unwrap();

        let series = crate::series::ObservationSeries::from_unsorted(vec![
            crate::series::Observation::new(
                crate::series::parse_timestamp("2025-03-01 16:00:00").unwrap(),
                21.0,
            ),
        ]);
        let summary = config.metrics_engine().summarize(&series).unwrap();
        assert_eq!(summary.points, 1);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let result = Config::from_toml_str("[metrics]\nshort_window = \"five\"");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_validation_errors() {
        let invalid = [
            "[metrics]\nshort_window = 0",
            "[metrics]\nsummary_hours = 0",
            "[metrics]\nsummary_rows = 0",
            "[refresh]\ndata_secs = 0",
            "[refresh]\nreport_secs = 2592000",
            "[refresh]\ndata_secs = 2147484",
            "[metrics]\nsummary_hours = 10000000000",
            "[alerts]\nmoderate = 30.0\nhigh = 20.0",
            "[server]\nbind = \"not an address\"",
            "[server]\ndownload_path = \"vix_data.csv\"",
            "[server]\ndownload_path = \"/api/report\"",
        ];

        for raw in invalid {
            assert!(
                matches!(
                    Config::from_toml_str(raw),
                    Err(ConfigError::ValidationError(_))
                ),
                "expected validation error for {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_builds_engine_and_classifier() {
        let config = Config::from_toml_str(
            "[metrics]\nshort_window = 3\nlong_window = 7\n[alerts]\nmoderate = 15.0\nhigh = 25.0",
        )
        .unwrap();

        let engine = config.metrics_engine();
        assert_eq!(engine.short_window(), 3);
        assert_eq!(engine.long_window(), 7);
        assert_eq!(
            config.classifier().classify(25.0),
            crate::alerts::AlertLevel::High
        );
    }
}
