//! Bar — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLC bar for a single interval, annotated with the strategy's signal flags.
///
/// Bars coming out of the data layer have both flags cleared; the signal
/// generator sets them before the sequence is handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub buy_signal: bool,
    #[serde(default)]
    pub sell_signal: bool,
}

impl Bar {
    /// Bar with zero volume and no signals.
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume: 0.0,
            buy_signal: false,
            sell_signal: false,
        }
    }

    pub fn with_signals(mut self, buy: bool, sell: bool) -> Self {
        self.buy_signal = buy;
        self.sell_signal = sell;
        self
    }

    fn prices(&self) -> [(&'static str, f64); 4] {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ]
    }
}

/// Malformed bar input, detected before any simulation starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("bar sequence is empty")]
    Empty,

    #[error("timestamps must be strictly increasing: bar {index} ({current}) is not after {previous}")]
    NonIncreasingTimestamp {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("bar {index}: {field} is not a finite number")]
    NonFinitePrice { index: usize, field: &'static str },

    #[error("bar {index}: {field} must be positive, got {value}")]
    NonPositivePrice {
        index: usize,
        field: &'static str,
        value: f64,
    },

    #[error("bar {index}: high {high} is below low {low}")]
    InvertedRange { index: usize, high: f64, low: f64 },
}

/// Check that a bar sequence satisfies the engine's input contract.
///
/// Every price must be finite and positive, `high >= low`, and timestamps must
/// be strictly increasing.
pub fn validate_bars(bars: &[Bar]) -> Result<(), BarError> {
    if bars.is_empty() {
        return Err(BarError::Empty);
    }

    for (index, bar) in bars.iter().enumerate() {
        for (field, value) in bar.prices() {
            if !value.is_finite() {
                return Err(BarError::NonFinitePrice { index, field });
            }
            if value <= 0.0 {
                return Err(BarError::NonPositivePrice { index, field, value });
            }
        }
        if bar.high < bar.low {
            return Err(BarError::InvertedRange {
                index,
                high: bar.high,
                low: bar.low,
            });
        }
        if index > 0 {
            let previous = bars[index - 1].timestamp;
            if bar.timestamp <= previous {
                return Err(BarError::NonIncreasingTimestamp {
                    index,
                    previous,
                    current: bar.timestamp,
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample_bar() -> Bar {
        Bar::new(
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            100.0,
            105.0,
            98.0,
            103.0,
        )
    }

    fn hourly(n: usize) -> Vec<Bar> {
        let base = sample_bar();
        (0..n)
            .map(|i| {
                let mut bar = base.clone();
                bar.timestamp = base.timestamp + Duration::hours(i as i64);
                bar
            })
            .collect()
    }

    #[test]
    fn with_signals_sets_flags() {
        let bar = sample_bar().with_signals(true, false);
        assert!(bar.buy_signal);
        assert!(!bar.sell_signal);
    }

    #[test]
    fn validate_accepts_ordered_bars() {
        assert_eq!(validate_bars(&hourly(5)), Ok(()));
    }

    #[test]
    fn validate_rejects_empty() {
        assert_eq!(validate_bars(&[]), Err(BarError::Empty));
    }

    #[test]
    fn validate_rejects_duplicate_timestamp() {
        let mut bars = hourly(3);
        bars[2].timestamp = bars[1].timestamp;
        assert!(matches!(
            validate_bars(&bars),
            Err(BarError::NonIncreasingTimestamp { index: 2, .. })
        ));
    }

    #[test]
    fn validate_rejects_nan_close() {
        let mut bars = hourly(3);
        bars[1].close = f64::NAN;
        assert_eq!(
            validate_bars(&bars),
            Err(BarError::NonFinitePrice {
                index: 1,
                field: "close"
            })
        );
    }

    #[test]
    fn validate_rejects_non_positive_low() {
        let mut bars = hourly(2);
        bars[0].low = 0.0;
        assert!(matches!(
            validate_bars(&bars),
            Err(BarError::NonPositivePrice { index: 0, field: "low", .. })
        ));
    }

    #[test]
    fn validate_rejects_inverted_range() {
        let mut bars = hourly(2);
        bars[1].high = 90.0;
        assert!(matches!(
            validate_bars(&bars),
            Err(BarError::InvertedRange { index: 1, .. })
        ));
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar().with_signals(false, true);
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
