//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1)
//! Seed: EMA[0] = close[0]; values before `period` observations are NaN.
//! Lookback: period - 1.

use super::{closes, Indicator};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        ema_of_series(&closes(bars), self.period)
    }
}

/// EMA of an arbitrary series with span `period`.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return vec![f64::NAN; values.len()];
    }
    ewm_mean(values, 2.0 / (period as f64 + 1.0), period)
}

/// Recursive exponentially weighted mean, seeded with the first observation.
///
/// Output is NaN until `min_periods` non-NaN values have been seen. Leading
/// NaNs delay the seed; a NaN after the seed repeats the previous value and
/// decays the old weight by `1 - alpha` for each missing step.
pub fn ewm_mean(values: &[f64], alpha: f64, min_periods: usize) -> Vec<f64> {
    let mut result = Vec::with_capacity(values.len());
    let mut mean = f64::NAN;
    let mut old_weight = 1.0;
    let mut observations = 0usize;

    for &x in values {
        let observed = !x.is_nan();
        if observed {
            observations += 1;
        }
        if mean.is_nan() {
            mean = x;
        } else {
            old_weight *= 1.0 - alpha;
            if observed {
                mean = (old_weight * mean + alpha * x) / (old_weight + alpha);
                old_weight = 1.0;
            }
        }
        result.push(if observations >= min_periods.max(1) {
            mean
        } else {
            f64::NAN
        });
    }

    result
}
