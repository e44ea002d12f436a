/// Metrics engine producing derived series and summaries
pub mod engine;

/// Trailing-window statistics
pub mod window;

pub use engine::{DerivedPoint, DerivedSeries, MetricsEngine, Summary, SummaryWindow};
