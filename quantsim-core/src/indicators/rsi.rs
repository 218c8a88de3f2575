//! Relative Strength Index (RSI).
//!
//! Gains and losses are smoothed with a recursive mean (alpha = 1/period)
//! seeded at the first bar, whose change counts as zero.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period - 1.
//! Edge cases: avg_loss == 0 → RSI = 100 (a flat series included).

use super::ema::ewm_mean;
use super::{closes, Indicator};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        rsi_of_series(&closes(bars), self.period)
    }
}

pub fn rsi_of_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return vec![f64::NAN; values.len()];
    }

    let mut gains = Vec::with_capacity(values.len());
    let mut losses = Vec::with_capacity(values.len());
    for (i, &value) in values.iter().enumerate() {
        let change = match i {
            0 => 0.0,
            _ => value - values[i - 1],
        };
        // NaN changes count as flat, matching `where(diff > 0, 0)`
        gains.push(if change > 0.0 { change } else { 0.0 });
        losses.push(if change < 0.0 { -change } else { 0.0 });
    }

    let alpha = 1.0 / period as f64;
    let avg_gain = ewm_mean(&gains, alpha, period);
    let avg_loss = ewm_mean(&losses, alpha, period);
    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&gain, &loss)| compute_rsi(gain, loss))
        .collect()
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain.is_nan() || avg_loss.is_nan() {
        f64::NAN
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    #[test]
    fn rsi_all_gains() {
        let bars = make_bars(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0]);
        let result = Rsi::new(3).compute(&bars);
        assert_approx(result[2], 100.0, 1e-6);
        assert_approx(result[5], 100.0, 1e-6);
    }

    #[test]
    fn rsi_all_losses() {
        let bars = make_bars(&[105.0, 104.0, 103.0, 102.0, 101.0, 100.0]);
        let result = Rsi::new(3).compute(&bars);
        assert_approx(result[2], 0.0, 1e-6);
        assert_approx(result[5], 0.0, 1e-6);
    }

    #[test]
    fn rsi_mixed_known_values() {
        // gains  0, .34, 0, 0, .72   losses 0, 0, .25, .48, 0
        let bars = make_bars(&[44.0, 44.34, 44.09, 43.61, 44.33]);
        let result = Rsi::new(3).compute(&bars);

        assert!(result[..2].iter().all(|v| v.is_nan()));
        assert_approx(result[2], 47.552_447_552_447_8, 1e-9);
        assert_approx(result[3], 18.941_504_178_273_05, 1e-9);
        assert_approx(result[4], 65.562_130_177_514_65, 1e-9);
    }

    #[test]
    fn rsi_flat_series_is_hundred() {
        let bars = make_bars(&[100.0; 6]);
        let result = Rsi::new(3).compute(&bars);
        assert!(result[..2].iter().all(|v| v.is_nan()));
        assert!(result[2..].iter().all(|&v| v == 100.0));
    }

    #[test]
    fn rsi_bounds() {
        let bars = make_bars(&[100.0, 105.0, 98.0, 110.0, 95.0, 115.0, 90.0, 120.0]);
        let result = Rsi::new(3).compute(&bars);
        for (i, &v) in result.iter().enumerate() {
            if !v.is_nan() {
                assert!((0.0..=100.0).contains(&v), "RSI out of bounds at bar {i}: {v}");
            }
        }
    }

    #[test]
    fn rsi_lookback() {
        assert_eq!(Rsi::new(14).lookback(), 13);
    }
}
