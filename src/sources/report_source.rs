use crate::error::ReportError;
use log::{debug, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Text shown when the report file has not been produced yet
pub const REPORT_PLACEHOLDER: &str = "Daily report is not available yet.";

/// Plain-text daily report read verbatim from disk
#[derive(Debug, Clone)]
pub struct ReportSource {
    path: PathBuf,
}

impl ReportSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole report
    ///
    /// A missing file yields [`REPORT_PLACEHOLDER`].
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Io` for any failure other than the file not existing.
    pub fn load(&self) -> Result<String, ReportError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => {
                debug!("Read {} bytes of report from {}", text.len(), self.path.display());
                Ok(text)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Report file {} not found", self.path.display());
                Ok(REPORT_PLACEHOLDER.to_string())
            }
            Err(source) => Err(ReportError::Io {
                path: self.path.display().to_string(),
                source,
            }),
        }
    }
}
