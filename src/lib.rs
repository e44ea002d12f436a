/// Error types for the dashboard
pub mod error;

/// Observations, series and date ranges
pub mod series;

/// File-backed data and report sources
pub mod sources;

/// Moving averages, percentage change and rolling summary
pub mod metrics;

/// Volatility alert classification
pub mod alerts;

/// Configuration management
pub mod config;

/// JSON view model rendered by the page
pub mod view;

/// Application context shared by the refresh ticks
pub mod app;

/// HTTP server and dashboard page
pub mod web;

// Re-export commonly used types
pub use error::{ConfigError, DashboardError, DataSourceError, ReportError};
