use crate::error::DataSourceError;
use crate::series::{parse_timestamp, Observation, ObservationSeries, TIMESTAMP_FORMAT};
use log::{debug, error, info, warn};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Anything that can supply the observation series for a refresh tick
#[cfg_attr(test, mockall::automock)]
pub trait ObservationSource: Send + Sync {
    /// Load the series, recovering a missing or malformed file as an empty series
    fn load(&self) -> Result<ObservationSeries, DataSourceError>;

    /// Raw file contents for download, `None` if the file does not exist
    fn raw(&self) -> Result<Option<Vec<u8>>, DataSourceError>;
}

/// Observations stored as a headerless two-column CSV file
///
/// Each line is `timestamp,value`. The file is re-read on every call; nothing
/// is cached between ticks.
#[derive(Debug, Clone)]
pub struct CsvDataSource {
    path: PathBuf,
}

impl CsvDataSource {
    /// Create a data source for the file at `path`
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use fear_gauge::sources::CsvDataSource;
    ///
    /// let source = CsvDataSource::new("vix_data.csv");
    /// let series = source.load().unwrap();
    /// println!("{} observations", series.len());
    /// ```
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file, reporting exactly why it could not be read
    ///
    /// # Errors
    ///
    /// * `DataSourceError::Missing` if the file does not exist
    /// * `DataSourceError::Malformed` for the first record that cannot be parsed
    /// * `DataSourceError::Io` for any other I/O failure
    pub fn read(&self) -> Result<ObservationSeries, DataSourceError> {
        let file = File::open(&self.path).map_err(|e| self.open_error(e))?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut observations = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| self.csv_error(e))?;
            if record.len() == 1 && record[0].is_empty() {
                continue;
            }
            let line = record.position().map(|pos| pos.line()).unwrap_or(0);
            observations.push(Self::parse_record(&record, line)?);
        }

        debug!(
            "Read {} observations from {}",
            observations.len(),
            self.path.display()
        );
        Ok(ObservationSeries::from_unsorted(observations))
    }

    /// Read the file, falling back to an empty series when it is missing or malformed
    ///
    /// # Errors
    ///
    /// Only `DataSourceError::Io` is returned; permission and disk errors are
    /// surfaced rather than hidden behind an empty chart.
    pub fn load(&self) -> Result<ObservationSeries, DataSourceError> {
        match self.read() {
            Ok(series) => Ok(series),
            Err(DataSourceError::Missing(path)) => {
                warn!("Observations file {} not found, using empty series", path);
                Ok(ObservationSeries::new())
            }
            Err(e @ DataSourceError::Malformed { .. }) => {
                warn!(
                    "Error loading data from {}: {}",
                    self.path.display(),
                    e
                );
                Ok(ObservationSeries::new())
            }
            Err(e) => {
                error!("Failed to read {}: {}", self.path.display(), e);
                Err(e)
            }
        }
    }

    /// File contents, byte for byte
    pub fn raw(&self) -> Result<Option<Vec<u8>>, DataSourceError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Append observations in the canonical `YYYY-MM-DD HH:MM:SS,value` layout
    ///
    /// Creates the file if needed. A final line without a trailing newline is
    /// terminated first so the new record starts on its own line.
    pub fn append(&self, observations: &[Observation]) -> Result<(), DataSourceError> {
        let needs_newline = self
            .ends_without_newline()
            .map_err(|e| self.io_error(e))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;

        if needs_newline {
            file.write_all(b"\n").map_err(|e| self.io_error(e))?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        for obs in observations {
            writer
                .write_record([
                    obs.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    obs.value.to_string(),
                ])
                .map_err(|e| self.io_error(std::io::Error::from(e)))?;
        }
        writer.flush().map_err(|e| self.io_error(e))?;

        info!(
            "Appended {} observation(s) to {}",
            observations.len(),
            self.path.display()
        );
        Ok(())
    }

    fn parse_record(record: &csv::StringRecord, line: u64) -> Result<Observation, DataSourceError> {
        if record.len() != 2 {
            return Err(DataSourceError::Malformed {
                line,
                reason: format!("expected 2 fields, found {}", record.len()),
            });
        }

        let timestamp = parse_timestamp(&record[0]).ok_or_else(|| DataSourceError::Malformed {
            line,
            reason: format!("unparsable timestamp '{}'", &record[0]),
        })?;

        let value = record[1]
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| DataSourceError::Malformed {
                line,
                reason: format!("invalid value '{}'", &record[1]),
            })?;

        Ok(Observation::new(timestamp, value))
    }

    fn ends_without_newline(&self) -> std::io::Result<bool> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };

        if file.metadata()?.len() == 0 {
            return Ok(false);
        }

        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))?;
        file.read_exact(&mut last)?;
        Ok(last[0] != b'\n')
    }

    fn open_error(&self, e: std::io::Error) -> DataSourceError {
        if e.kind() == ErrorKind::NotFound {
            DataSourceError::Missing(self.path.display().to_string())
        } else {
            self.io_error(e)
        }
    }

    fn csv_error(&self, e: csv::Error) -> DataSourceError {
        let line = e.position().map(|pos| pos.line()).unwrap_or(0);
        let reason = e.to_string();
        match e.into_kind() {
            csv::ErrorKind::Io(source) => self.io_error(source),
            _ => DataSourceError::Malformed { line, reason },
        }
    }

    fn io_error(&self, source: std::io::Error) -> DataSourceError {
        DataSourceError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl ObservationSource for CsvDataSource {
    fn load(&self) -> Result<ObservationSeries, DataSourceError> {
        CsvDataSource::load(self)
    }

    fn raw(&self) -> Result<Option<Vec<u8>>, DataSourceError> {
        CsvDataSource::raw(self)
    }
}
