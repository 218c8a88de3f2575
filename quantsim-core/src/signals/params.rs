//! Indicator windows and thresholds for the confirmation strategy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("{name} must be >= 1, got {value}")]
    ZeroWindow { name: &'static str, value: usize },

    #[error("{indicator} fast window ({fast}) must be below slow window ({slow})")]
    FastNotBelowSlow {
        indicator: &'static str,
        fast: usize,
        slow: usize,
    },

    #[error("rsi_low ({low}) must be below rsi_high ({high})")]
    ThresholdOrder { low: f64, high: f64 },

    #[error("{name} must lie within [0, 100], got {value}")]
    ThresholdRange { name: &'static str, value: f64 },
}

/// Parameters for the RSI / SMA / MACD 2-of-3 signal generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalParams {
    pub rsi_window: usize,
    pub rsi_low: f64,
    pub rsi_high: f64,
    pub sma_fast: usize,
    pub sma_slow: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            rsi_window: 14,
            rsi_low: 30.0,
            rsi_high: 70.0,
            sma_fast: 20,
            sma_slow: 50,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

impl SignalParams {
    pub fn validate(&self) -> Result<(), SignalError> {
        for (name, value) in [
            ("rsi_window", self.rsi_window),
            ("sma_fast", self.sma_fast),
            ("sma_slow", self.sma_slow),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
        ] {
            if value == 0 {
                return Err(SignalError::ZeroWindow { name, value });
            }
        }
        if self.sma_fast >= self.sma_slow {
            return Err(SignalError::FastNotBelowSlow {
                indicator: "sma",
                fast: self.sma_fast,
                slow: self.sma_slow,
            });
        }
        if self.macd_fast >= self.macd_slow {
            return Err(SignalError::FastNotBelowSlow {
                indicator: "macd",
                fast: self.macd_fast,
                slow: self.macd_slow,
            });
        }
        for (name, value) in [("rsi_low", self.rsi_low), ("rsi_high", self.rsi_high)] {
            if !(0.0..=100.0).contains(&value) {
                return Err(SignalError::ThresholdRange { name, value });
            }
        }
        if self.rsi_low >= self.rsi_high {
            return Err(SignalError::ThresholdOrder {
                low: self.rsi_low,
                high: self.rsi_high,
            });
        }
        Ok(())
    }

    /// Bars consumed before every indicator is defined.
    pub fn warmup(&self) -> usize {
        self.rsi_window
            .saturating_sub(1)
            .max(self.sma_slow - 1)
            .max(self.macd_slow + self.macd_signal - 2)
    }
}
