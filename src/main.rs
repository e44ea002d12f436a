use anyhow::{bail, Context};
use chrono::{SubsecRound, Utc};
use clap::{Parser, Subcommand};
use fear_gauge::app::AppContext;
use fear_gauge::config::Config;
use fear_gauge::error::{ConfigError, DashboardError};
use fear_gauge::series::{parse_timestamp, Observation};
use fear_gauge::sources::CsvDataSource;
use fear_gauge::web::{DashboardServer, PageSettings};
use log::{error, info, warn};
use std::path::PathBuf;
use tokio::sync::watch;

/// Command-line arguments for the volatility dashboard
#[derive(Parser)]
#[command(
    name = "fear-gauge",
    about = "Volatility index dashboard - live chart, moving averages and alert level",
    long_about = "Serves a self-refreshing web dashboard over a CSV file of volatility index \
                  readings and a plain-text daily report, both written by external jobs."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        global = true,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Serve the dashboard (default)
    Serve,
    /// Append one reading to the observations file
    Record {
        /// Index value
        #[arg(long, allow_negative_numbers = true)]
        value: f64,
        /// Reading time, defaults to now (UTC)
        #[arg(long, value_name = "TIMESTAMP")]
        at: Option<String>,
    },
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// # Returns
    ///
    /// `Ok(())` if all arguments are valid, `Err(String)` with error message otherwise
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            // Missing files fall back to defaults in Dashboard::load_config
            if config_path.exists() {
                if !config_path.is_file() {
                    return Err(format!(
                        "Configuration path is not a file: {}",
                        config_path.display()
                    ));
                }

                if let Some(extension) = config_path.extension() {
                    if extension != "toml" {
                        warn!(
                            "Configuration file does not have .toml extension: {}",
                            config_path.display()
                        );
                    }
                }
            }
        }

        if let Some(Command::Record { value, .. }) = &self.command {
            if !value.is_finite() {
                return Err(format!("Reading must be a finite number, got {}", value));
            }
        }

        Ok(())
    }

    /// Convert config path to string safely, handling non-UTF-8 paths
    ///
    /// # Returns
    ///
    /// `Ok(Some(path_str))` if config is provided and valid UTF-8,
    /// `Ok(None)` if no config provided,
    /// `Err(String)` if config path contains invalid UTF-8
    fn config_path_str(&self) -> Result<Option<&str>, String> {
        match &self.config {
            Some(path) => match path.to_str() {
                Some(path_str) => Ok(Some(path_str)),
                None => Err(format!(
                    "Configuration file path contains invalid UTF-8 characters: {}",
                    path.display()
                )),
            },
            None => Ok(None),
        }
    }
}

/// Top-level application: configuration plus the shutdown channel
pub struct Dashboard {
    config: Config,
    shutdown_sender: watch::Sender<bool>,
    shutdown_receiver: watch::Receiver<bool>,
}

impl Dashboard {
    /// Create the application from a configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the configuration is inconsistent.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let (shutdown_sender, shutdown_receiver) = watch::channel(false);
        Ok(Self {
            config,
            shutdown_sender,
            shutdown_receiver,
        })
    }

    /// Load configuration from file or use defaults
    ///
    /// # Arguments
    ///
    /// * `config_path` - Optional path to configuration file
    ///
    /// # Returns
    ///
    /// Loaded configuration or default configuration if file not found or invalid
    pub fn load_config(config_path: Option<&str>) -> Result<Config, ConfigError> {
        match config_path {
            Some(path) => {
                info!("Loading configuration from: {}", path);
                match Config::from_file(std::path::Path::new(path)) {
                    Ok(config) => Ok(config),
                    Err(ConfigError::ReadError(_)) => {
                        warn!(
                            "Configuration file '{}' not found or unreadable, using defaults",
                            path
                        );
                        Ok(Config::default())
                    }
                    Err(e) => {
                        error!("Configuration error in '{}': {}", path, e);
                        warn!("Using default configuration due to invalid config file");
                        Ok(Config::default())
                    }
                }
            }
            None => {
                info!("Using default configuration");
                Ok(Config::default())
            }
        }
    }

    /// Sender that stops [`Dashboard::serve`] when it publishes `true`
    pub fn shutdown_handle(&self) -> watch::Sender<bool> {
        self.shutdown_sender.clone()
    }

    /// Serve the dashboard until shutdown is requested
    pub async fn serve(&self) -> Result<(), DashboardError> {
        let addr = self.config.bind_addr().map_err(|e| DashboardError::Server(e.to_string()))?;
        let app = AppContext::from_config(&self.config);
        let page = PageSettings::from_config(&self.config);

        info!(
            "Refreshing data every {}s and report every {}s",
            self.config.refresh.data_secs, self.config.refresh.report_secs
        );

        DashboardServer::new(app, page)
            .run(addr, self.shutdown_receiver.clone())
            .await
    }

    /// Append one reading to the configured observations file
    pub fn record(&self, value: f64, at: Option<&str>) -> anyhow::Result<Observation> {
        if !value.is_finite() {
            bail!("reading must be a finite number, got {}", value);
        }

        let timestamp = match at {
            Some(raw) => parse_timestamp(raw)
                .with_context(|| format!("unrecognised timestamp '{}'", raw))?,
            None => Utc::now().naive_utc().trunc_subsecs(0),
        };

        let observation = Observation::new(timestamp, value);
        let source = CsvDataSource::new(self.config.data.path.clone());
        source.append(&[observation]).with_context(|| {
            format!(
                "failed to append reading to {}",
                self.config.data.path.display()
            )
        })?;

        info!(
            "Recorded {:.2} at {} in {}",
            value,
            timestamp,
            self.config.data.path.display()
        );
        Ok(observation)
    }
}

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    // Validate CLI arguments
    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    // Load configuration with safe path handling
    let config_path = match cli.config_path_str() {
        Ok(path) => path,
        Err(e) => {
            error!("Invalid configuration path: {}", e);
            std::process::exit(1);
        }
    };

    let config = match Dashboard::load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let dashboard = match Dashboard::new(config) {
        Ok(dashboard) => dashboard,
        Err(e) => {
            error!("Failed to initialize dashboard: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(Command::Record { value, at }) = &cli.command {
        if let Err(e) = dashboard.record(*value, at.as_deref()) {
            error!("Failed to record reading: {:#}", e);
            std::process::exit(1);
        }
        return;
    }

    info!("Starting volatility dashboard");

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    // Set up signal handling for graceful shutdown
    let shutdown_sender = dashboard.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received interrupt signal (SIGINT), shutting down gracefully...");
        if let Err(e) = shutdown_sender.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
    }) {
        error!("Error setting SIGINT handler: {}", e);
        std::process::exit(1);
    }

    info!("Dashboard is running. Press Ctrl+C to stop.");

    if let Err(e) = runtime.block_on(dashboard.serve()) {
        error!("Dashboard stopped with error: {}", e);
        std::process::exit(1);
    }

    info!("Dashboard shutdown complete");
}
