//! Monthly activity forecasting.
//!
//! A [`Forecaster`] projects the next period of a monthly series under one of two
//! [`ForecastPolicy`] values and labels the projection with a [`Confidence`] derived from the
//! series' size and spread.

mod growth;
mod linear;

use crate::analysis::MonthlySeries;
use clap::ValueEnum;
use serde::Serialize;
use statrs::statistics::Statistics;
use strum::Display;

/// Default monthly growth applied by [`ForecastPolicy::Growth`].
pub const DEFAULT_GROWTH_RATE: f64 = 0.10;

/// Series shorter than this always get [`Confidence::Low`].
const MIN_CONFIDENT_POINTS: usize = 3;

const HIGH_CONFIDENCE_LIMIT: f64 = 0.1;
const MEDIUM_CONFIDENCE_LIMIT: f64 = 0.3;

const MONTHS_PER_YEAR: f64 = 12.0;

/// How the next period is projected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ForecastPolicy {
    /// Last value grown by a fixed rate, adjusted by the fitted trend.
    #[default]
    Growth,

    /// Least-squares line evaluated one step past the data.
    Linear,
}

/// Qualitative reliability of a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Inputs that shaped a forecast, rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Factors {
    pub historical_trend: f64,
    pub growth_rate: f64,
    pub variance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastResult {
    pub monthly: u64,

    /// Twelve times the unrounded projection, then rounded.
    pub annual: u64,

    pub confidence: Confidence,
    pub factors: Factors,
}

impl ForecastResult {
    /// Forecast for a series with no data.
    #[must_use]
    pub const fn empty(growth_rate: f64) -> Self {
        Self {
            monthly: 0,
            annual: 0,
            confidence: Confidence::Low,
            factors: Factors {
                historical_trend: 0.0,
                growth_rate,
                variance: 0.0,
            },
        }
    }
}

/// Projects monthly series under a fixed policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forecaster {
    policy: ForecastPolicy,
    growth_rate: f64,
    months_ahead: u32,
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::new(ForecastPolicy::Growth, DEFAULT_GROWTH_RATE, 1)
    }
}

impl Forecaster {
    #[must_use]
    pub const fn new(policy: ForecastPolicy, growth_rate: f64, months_ahead: u32) -> Self {
        Self {
            policy,
            growth_rate,
            months_ahead,
        }
    }

    #[must_use]
    pub const fn policy(&self) -> ForecastPolicy {
        self.policy
    }

    /// Growth rate reported in the factors: the configured rate, or zero when the policy
    /// applies none.
    const fn applied_growth_rate(&self) -> f64 {
        match self.policy {
            ForecastPolicy::Growth => self.growth_rate,
            ForecastPolicy::Linear => 0.0,
        }
    }

    #[must_use]
    #[expect(clippy::cast_precision_loss, reason = "commit counts are far below 2^52")]
    pub fn forecast(&self, series: &MonthlySeries) -> ForecastResult {
        let values: Vec<f64> = series.counts().map(|c| c as f64).collect();
        self.forecast_values(&values)
    }

    fn forecast_values(&self, values: &[f64]) -> ForecastResult {
        if values.is_empty() {
            return ForecastResult::empty(round2(self.applied_growth_rate()));
        }

        let slope = ols_slope(values);
        let projected = match self.policy {
            ForecastPolicy::Growth => growth::project(values, slope, self.growth_rate, self.months_ahead),
            ForecastPolicy::Linear => linear::project(values),
        };

        let monthly = to_count(projected);
        let variance = sample_variance(values);

        ForecastResult {
            monthly,
            annual: to_count(projected * MONTHS_PER_YEAR),
            confidence: confidence(values.len(), variance),
            factors: Factors {
                historical_trend: round2(slope),
                growth_rate: round2(self.applied_growth_rate()),
                variance: round2(variance),
            },
        }
    }
}

/// Least-squares fit of `values` against their index, as `(slope, intercept)`.
///
/// A single point has zero slope and passes through itself.
#[expect(clippy::cast_precision_loss, reason = "series lengths are tiny")]
fn ols_fit(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    if values.len() < 2 {
        return (0.0, values.first().copied().unwrap_or(0.0));
    }

    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy = dx.mul_add(y - mean_y, sxy);
        sxx = dx.mul_add(dx, sxx);
    }

    let slope = sxy / sxx;
    (slope, slope.mul_add(-mean_x, mean_y))
}

fn ols_slope(values: &[f64]) -> f64 {
    ols_fit(values).0
}

/// Unbiased sample variance, zero when fewer than two points exist.
fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.variance()
}

/// Confidence from the sample size and the variance normalized by the squared sample size.
#[expect(clippy::cast_precision_loss, reason = "series lengths are tiny")]
fn confidence(count: usize, variance: f64) -> Confidence {
    if count < MIN_CONFIDENT_POINTS {
        return Confidence::Low;
    }

    let n = count as f64;
    let normalized = variance / (n * n);
    if normalized < HIGH_CONFIDENCE_LIMIT {
        Confidence::High
    } else if normalized < MEDIUM_CONFIDENCE_LIMIT {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

/// Round a projection to a non-negative whole count.
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "value is rounded and clamped first")]
fn to_count(projected: f64) -> u64 {
    if !projected.is_finite() {
        return 0;
    }
    projected.max(0.0).round() as u64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
