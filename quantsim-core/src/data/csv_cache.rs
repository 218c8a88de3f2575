//! CSV bar cache — `Open time,Open,High,Low,Close,Volume`.
//!
//! `Open time` is written as `YYYY-MM-DD HH:MM:SS+00:00`. On read it may also
//! be RFC 3339, a naive `YYYY-MM-DD HH:MM:SS` (taken as UTC), a bare date, or
//! epoch milliseconds.

use super::provider::DataError;
use crate::domain::Bar;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

const OPEN_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(rename = "Open time")]
    open_time: String,
    #[serde(rename = "Open")]
    open: f64,
    #[serde(rename = "High")]
    high: f64,
    #[serde(rename = "Low")]
    low: f64,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "Volume", default)]
    volume: f64,
}

/// Parse an `Open time` cell.
pub fn parse_open_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ms) = value.parse::<i64>() {
        return DateTime::from_timestamp_millis(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(value, OPEN_TIME_FORMAT) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn format_open_time(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(OPEN_TIME_FORMAT).to_string()
}

/// Read bars from any CSV source, sorted by open time.
///
/// Rows sharing an open time keep the first occurrence.
pub fn read_bars<R: std::io::Read>(reader: R) -> Result<Vec<Bar>, DataError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    for (row, record) in rdr.deserialize::<CsvRow>().enumerate() {
        let record = record?;
        let timestamp =
            parse_open_time(&record.open_time).ok_or_else(|| DataError::InvalidTimestamp {
                row,
                value: record.open_time.clone(),
            })?;
        let mut bar = Bar::new(timestamp, record.open, record.high, record.low, record.close);
        bar.volume = record.volume;
        bars.push(bar);
    }

    bars.sort_by_key(|b| b.timestamp);
    let before = bars.len();
    bars.dedup_by_key(|b| b.timestamp);
    if bars.len() < before {
        tracing::warn!(dropped = before - bars.len(), "dropped duplicate open times");
    }
    Ok(bars)
}

pub fn load_csv(path: &Path) -> Result<Vec<Bar>, DataError> {
    let file = std::fs::File::open(path)?;
    let bars = read_bars(file)?;
    tracing::info!(path = %path.display(), bars = bars.len(), "loaded bar cache");
    Ok(bars)
}

pub fn write_bars<W: std::io::Write>(writer: W, bars: &[Bar]) -> Result<(), DataError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for bar in bars {
        wtr.serialize(CsvRow {
            open_time: format_open_time(&bar.timestamp),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write bars to `path`, creating parent directories as needed.
pub fn save_csv(path: &Path, bars: &[Bar]) -> Result<(), DataError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path)?;
    write_bars(file, bars)?;
    tracing::info!(path = %path.display(), bars = bars.len(), "wrote bar cache");
    Ok(())
}
