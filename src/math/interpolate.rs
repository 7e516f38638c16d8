use num_traits::Float;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpolationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Grid mismatch: {0}")]
    GridMismatch(String),
}

/// Generic linear interpolation between two values
pub fn lin_interp<T: Float>(v0: T, v1: T, fac: T) -> T {
    v0 + (v1 - v0) * fac
}

/// Linear interpolation through two points, extended beyond them
pub fn linear_interpolate(x0: f64, y0: f64, x1: f64, y1: f64, x: f64) -> f64 {
    if x == x0 {
        return y0;
    }
    if x == x1 {
        return y1;
    }
    lin_interp(y0, y1, (x - x0) / (x1 - x0))
}

/// Resample an irregular series onto `dst_times`.
///
/// Piecewise-linear between source nodes; outside the source range the
/// first or last segment is extended linearly. Destination times that hit
/// a source node return that node's value exactly. `src_times` must be
/// strictly ascending and hold at least two samples.
pub fn resample(
    src_times: &[f64],
    src_values: &[f64],
    dst_times: &[f64],
) -> Result<Vec<f64>, InterpolationError> {
    check_source(src_times, src_values)?;

    let last_segment = src_times.len() - 2;
    let resampled = dst_times
        .iter()
        .map(|&t| {
            // Number of source nodes at or before t
            let upper = src_times.partition_point(|&s| s <= t);
            if upper > 0 && src_times[upper - 1] == t {
                return src_values[upper - 1];
            }
            let lo = upper.saturating_sub(1).min(last_segment);
            linear_interpolate(
                src_times[lo],
                src_values[lo],
                src_times[lo + 1],
                src_values[lo + 1],
                t,
            )
        })
        .collect();

    Ok(resampled)
}

fn check_source(src_times: &[f64], src_values: &[f64]) -> Result<(), InterpolationError> {
    if src_times.len() != src_values.len() {
        return Err(InterpolationError::InvalidInput(format!(
            "{} source times but {} source values",
            src_times.len(),
            src_values.len()
        )));
    }
    if src_times.len() < 2 {
        return Err(InterpolationError::InvalidInput(format!(
            "at least two source samples are needed, got {}",
            src_times.len()
        )));
    }
    if let Some(k) = src_times.windows(2).position(|w| !(w[0] < w[1])) {
        return Err(InterpolationError::InvalidInput(format!(
            "source times must be strictly ascending (index {}: {} -> {})",
            k,
            src_times[k],
            src_times[k + 1]
        )));
    }
    Ok(())
}
