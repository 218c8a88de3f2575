//! Data acquisition, caching, and splitting.

pub mod binance;
pub mod csv_cache;
pub mod provider;
pub mod split;

pub use binance::BinanceProvider;
pub use csv_cache::{load_csv, parse_open_time, read_bars, save_csv, write_bars};
pub use provider::{DataError, DataProvider, Interval};
pub use split::{split_by_ratio, DataSplit};

use crate::domain::Bar;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Load bars from `cache` if it exists; otherwise fetch them from `provider`
/// and write the cache.
pub fn load_or_fetch(
    cache: &Path,
    provider: &dyn DataProvider,
    symbol: &str,
    interval: Interval,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Bar>, DataError> {
    if cache.exists() {
        tracing::info!(path = %cache.display(), "using cached bars");
        return load_csv(cache);
    }

    tracing::info!(
        provider = provider.name(),
        symbol,
        %interval,
        %start,
        %end,
        "cache miss, downloading"
    );
    let bars = provider.fetch(symbol, interval, start, end)?;
    save_csv(cache, &bars)?;
    Ok(bars)
}

/// BLAKE3 digest over timestamps and OHLC, hex-encoded.
///
/// Identifies the exact dataset a result was computed from.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(bars.len() as u64).to_le_bytes());
    for bar in bars {
        hasher.update(&bar.timestamp.timestamp_millis().to_le_bytes());
        for price in [bar.open, bar.high, bar.low, bar.close] {
            hasher.update(&price.to_bits().to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}
