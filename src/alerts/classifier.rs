use serde::{Deserialize, Serialize};

/// Default lower bound of the Moderate tier
pub const DEFAULT_MODERATE_THRESHOLD: f64 = 20.0;

/// Default lower bound of the High tier
pub const DEFAULT_HIGH_THRESHOLD: f64 = 30.0;

/// Volatility severity shown on the status badge
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// Calm market
    Low,
    /// Elevated volatility
    Moderate,
    /// Fear in the market
    High,
}

impl AlertLevel {
    /// Human-readable badge text
    pub fn label(&self) -> &'static str {
        match self {
            AlertLevel::Low => "Low volatility",
            AlertLevel::Moderate => "Moderate volatility",
            AlertLevel::High => "High volatility",
        }
    }

    /// Badge colour class for the page
    pub fn color(&self) -> &'static str {
        match self {
            AlertLevel::Low => "success",
            AlertLevel::Moderate => "warning",
            AlertLevel::High => "danger",
        }
    }
}

/// Maps the latest index value to an [`AlertLevel`]
///
/// Each tier includes its lower bound: with the defaults, exactly 20 is
/// Moderate and exactly 30 is High. The function is total; a NaN input fails
/// both comparisons and lands in High, so callers that can see NaN should
/// check `is_finite` first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertClassifier {
    moderate: f64,
    high: f64,
}

impl Default for AlertClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_MODERATE_THRESHOLD, DEFAULT_HIGH_THRESHOLD)
    }
}

impl AlertClassifier {
    /// Create a classifier with custom tier boundaries
    ///
    /// # Arguments
    ///
    /// * `moderate` - Values at or above this are at least Moderate
    /// * `high` - Values at or above this are High
    pub fn new(moderate: f64, high: f64) -> Self {
        Self { moderate, high }
    }

    pub fn classify(&self, value: f64) -> AlertLevel {
        if value < self.moderate {
            AlertLevel::Low
        } else if value < self.high {
            AlertLevel::Moderate
        } else {
            AlertLevel::High
        }
    }
}
