//! Trailing-window statistics over plain value slices.
//!
//! Undefined points are `None` rather than NaN or zero so they can be
//! serialized as gaps.

/// Simple moving average over the trailing `period` values.
///
/// The first `period - 1` entries are `None`. A zero period yields all `None`.
pub fn simple_moving_average(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 || values.len() < period {
        return vec![None; values.len()];
    }

    let mut result = vec![None; period - 1];
    result.extend(
        values
            .windows(period)
            .map(|window| Some(window.iter().sum::<f64>() / period as f64)),
    );
    result
}

/// Percentage change from the previous value.
///
/// The first entry is `None`, as is any entry whose previous value is zero.
pub fn percentage_change(values: &[f64]) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(values.len());
    if values.is_empty() {
        return result;
    }

    result.push(None);
    result.extend(values.windows(2).map(|pair| {
        let (previous, current) = (pair[0], pair[1]);
        if previous == 0.0 {
            None
        } else {
            Some((current - previous) / previous * 100.0)
        }
    }));
    result
}
