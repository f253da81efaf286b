//! Least-squares trend continuation.

use super::ols_fit;

/// Value of the fitted line at index `values.len()`, one step past the data.
#[expect(clippy::cast_precision_loss, reason = "series lengths are tiny")]
pub fn project(values: &[f64]) -> f64 {
    let (slope, intercept) = ols_fit(values);
    slope.mul_add(values.len() as f64, intercept)
}
