/// Observations file reader and recorder
pub mod data_source;

/// Daily report reader
pub mod report_source;

pub use data_source::{CsvDataSource, ObservationSource};
pub use report_source::{ReportSource, REPORT_PLACEHOLDER};
