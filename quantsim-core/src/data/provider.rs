//! Data provider trait, bar intervals, and structured error types.
//!
//! The DataProvider trait abstracts over remote sources (Binance klines) so the
//! cache layer can be tested against a mock.

use crate::domain::{Bar, BarError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("provider returned no data for {symbol}")]
    NoData { symbol: String },

    #[error("unsupported interval '{0}'")]
    InvalidInterval(String),

    #[error("row {row}: unparseable open time '{value}'")]
    InvalidTimestamp { row: usize, value: String },

    #[error("invalid split ratios train={train}, test={test}")]
    InvalidSplit { train: f64, test: f64 },

    #[error("invalid bars: {0}")]
    Validation(#[from] BarError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data error: {0}")]
    Other(String),
}

/// Kline interval supported by the downloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interval {
    Minute1,
    Minute5,
    Minute15,
    Minute30,
    Hour1,
    Hour2,
    Hour4,
    Hour6,
    Hour12,
    Day1,
    Week1,
}

const MINUTE_MS: i64 = 60 * 1000;
const YEAR_MS: f64 = 365.25 * 24.0 * 3600.0 * 1000.0;

impl Interval {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minute1 => "1m",
            Self::Minute5 => "5m",
            Self::Minute15 => "15m",
            Self::Minute30 => "30m",
            Self::Hour1 => "1h",
            Self::Hour2 => "2h",
            Self::Hour4 => "4h",
            Self::Hour6 => "6h",
            Self::Hour12 => "12h",
            Self::Day1 => "1d",
            Self::Week1 => "1w",
        }
    }

    pub fn millis(self) -> i64 {
        let minutes = match self {
            Self::Minute1 => 1,
            Self::Minute5 => 5,
            Self::Minute15 => 15,
            Self::Minute30 => 30,
            Self::Hour1 => 60,
            Self::Hour2 => 2 * 60,
            Self::Hour4 => 4 * 60,
            Self::Hour6 => 6 * 60,
            Self::Hour12 => 12 * 60,
            Self::Day1 => 24 * 60,
            Self::Week1 => 7 * 24 * 60,
        };
        minutes * MINUTE_MS
    }

    /// Bars per 365.25-day year; 8766 for hourly bars.
    pub fn periods_per_year(self) -> f64 {
        YEAR_MS / self.millis() as f64
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let interval = match s {
            "1m" => Self::Minute1,
            "5m" => Self::Minute5,
            "15m" => Self::Minute15,
            "30m" => Self::Minute30,
            "1h" => Self::Hour1,
            "2h" => Self::Hour2,
            "4h" => Self::Hour4,
            "6h" => Self::Hour6,
            "12h" => Self::Hour12,
            "1d" => Self::Day1,
            "1w" => Self::Week1,
            other => return Err(DataError::InvalidInterval(other.to_string())),
        };
        Ok(interval)
    }
}

impl TryFrom<String> for Interval {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(value: Interval) -> Self {
        value.as_str().to_string()
    }
}

/// Trait for remote bar sources.
///
/// Providers return bars sorted by open time with signal flags cleared.
/// The CSV cache sits above this trait; providers don't know about it.
pub trait DataProvider: Send + Sync {
    fn name(&self) -> &str;

    fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, DataError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_roundtrip() {
        for s in ["1m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "12h", "1d", "1w"] {
            let interval: Interval = s.parse().unwrap();
            assert_eq!(interval.as_str(), s);
        }
    }

    #[test]
    fn hourly_periods_per_year() {
        assert!((Interval::Hour1.periods_per_year() - 24.0 * 365.25).abs() < 1e-9);
        assert_eq!(Interval::Hour1.millis(), 3_600_000);
    }

    #[test]
    fn unknown_interval_is_rejected() {
        let err = "7h".parse::<Interval>().unwrap_err();
        assert!(matches!(err, DataError::InvalidInterval(s) if s == "7h"));
    }

    #[test]
    fn interval_serializes_as_string() {
        let json = serde_json::to_string(&Interval::Hour4).unwrap();
        assert_eq!(json, "\"4h\"");
        let back: Interval = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Interval::Hour4);
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = DataError::RateLimited {
            retry_after_secs: 30,
        };
        assert_eq!(err.to_string(), "rate limited by provider (retry after 30s)");
    }
}
