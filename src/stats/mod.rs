//! Descriptive statistics used by the region and blocking analyses.
//!
//! - [`Summary`]: Descriptive statistics (mean, median, std_dev, percentiles)
//! - [`mean`], [`std_dev`]: Basic statistical functions
//! - [`percentile_sorted`]: Percentile calculation (R-7 interpolation)
//! - [`RunningStats`]: Single-pass mean and population standard deviation

use serde::{Deserialize, Serialize};

/// Descriptive statistics for a set of measurements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    /// Number of values.
    pub count: usize,
    /// Mean value.
    pub mean: f64,
    /// Median value.
    pub median: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    /// Minimum value.
    pub min: f64,
    /// Maximum value.
    pub max: f64,
    /// 95th percentile.
    pub p95: f64,
}

impl Summary {
    /// Compute summary statistics for a slice of values.
    ///
    /// Returns `None` if the slice is empty.
    #[must_use]
    pub fn compute(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sort_floats(&mut sorted);

        let count = sorted.len();
        Some(Self {
            count,
            mean: mean(&sorted),
            median: percentile_sorted(&sorted, 0.5),
            std_dev: std_dev(&sorted),
            min: sorted[0],
            max: sorted[count - 1],
            p95: percentile_sorted(&sorted, 0.95),
        })
    }
}

/// Sort floats ascending; NaNs compare equal to everything.
pub fn sort_floats<T: PartialOrd>(values: &mut [T]) {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
}

/// Compute arithmetic mean.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Compute population standard deviation (N denominator).
///
/// # Example
///
/// ```
/// use artifact_eval::stats::std_dev;
///
/// let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
/// assert!((std_dev(&values) - 2.0).abs() < 0.001);
/// ```
#[must_use]
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Percentile of pre-sorted values, interpolating between the two
/// bracketing order statistics (R-7). `p` is clamped to 0.0..=1.0.
///
/// # Example
///
/// ```
/// use artifact_eval::stats::percentile_sorted;
///
/// let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
/// assert!((percentile_sorted(&sorted, 0.5) - 3.0).abs() < 0.001);
/// assert!((percentile_sorted(&sorted, 0.3) - 2.2).abs() < 0.001);
/// assert!((percentile_sorted(&sorted, 2.0) - 5.0).abs() < 0.001);
/// ```
#[must_use]
pub fn percentile_sorted<T: Copy + Into<f64>>(sorted: &[T], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0].into();
    }

    let p = p.clamp(0.0, 1.0);
    let idx = p * (sorted.len() - 1) as f64;
    let lower = idx.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    let frac = idx - lower as f64;

    let lo: f64 = sorted[lower].into();
    let hi: f64 = sorted[upper].into();
    if lower == upper || frac == 0.0 || lo == hi {
        lo
    } else {
        lo * (1.0 - frac) + hi * frac
    }
}

/// Streaming accumulator for mean and population standard deviation.
///
/// Variance is computed as `E[x^2] - E[x]^2`, clamped at zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStats {
    count: usize,
    sum: f64,
    sum_sq: f64,
}

impl RunningStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    #[must_use]
    pub fn std_dev(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        let mean = self.sum / n;
        (self.sum_sq / n - mean * mean).max(0.0).sqrt()
    }
}
