/// Threshold classification of the latest reading
pub mod classifier;

pub use classifier::{AlertClassifier, AlertLevel};
