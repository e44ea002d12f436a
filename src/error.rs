use thiserror::Error;

/// Errors that can occur while reading or writing the observations file
#[derive(Error, Debug)]
pub enum DataSourceError {
    #[error("Observations file not found: {0}")]
    Missing(String),

    #[error("Malformed record at line {line}: {reason}")]
    Malformed { line: u64, reason: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while reading the daily report
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while building or serving the dashboard
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),

    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}
