//! Growth-and-trend projection.

/// `last * (1 + growth_rate) + slope * months_ahead`, not yet clamped.
pub fn project(values: &[f64], slope: f64, growth_rate: f64, months_ahead: u32) -> f64 {
    let last = values.last().copied().unwrap_or(0.0);
    last.mul_add(1.0 + growth_rate, slope * f64::from(months_ahead))
}
