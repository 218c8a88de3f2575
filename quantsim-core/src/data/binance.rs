//! Binance spot klines provider.
//!
//! Pages through `/api/v3/klines` 1000 rows at a time, advancing the start by
//! one interval past the last open time. Retries transient failures with
//! exponential backoff and sleeps briefly between pages.

use super::provider::{DataError, DataProvider, Interval};
use crate::domain::Bar;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;

pub const KLINES_URL: &str = "https://api.binance.com/api/v3/klines";
/// Maximum rows Binance returns per request.
pub const PAGE_LIMIT: usize = 1000;

pub struct BinanceProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    max_retries: u32,
    base_delay: Duration,
    page_delay: Duration,
}

impl BinanceProvider {
    pub fn new() -> Result<Self, DataError> {
        Self::with_base_url(KLINES_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("quantsim/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            page_delay: Duration::from_millis(100),
        })
    }

    /// Fetch one page starting at `start_ms`, retrying transient failures.
    fn fetch_page(
        &self,
        symbol: &str,
        interval: Interval,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Bar>, DataError> {
        let query = [
            ("symbol", symbol.to_string()),
            ("interval", interval.as_str().to_string()),
            ("limit", PAGE_LIMIT.to_string()),
            ("startTime", start_ms.to_string()),
            ("endTime", end_ms.to_string()),
        ];
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                tracing::warn!(attempt, ?delay, "retrying klines request");
                std::thread::sleep(delay);
            }

            match self.client.get(&self.base_url).query(&query).send() {
                Ok(resp) => {
                    let status = resp.status();

                    // 418 is Binance's IP-ban escalation of 429
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 418 {
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        return Err(DataError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                    }

                    if status.is_server_error() {
                        last_error = Some(DataError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    if !status.is_success() {
                        let body = resp.text().unwrap_or_default();
                        return Err(DataError::ResponseFormatChanged(format!(
                            "HTTP {status} for {symbol}: {body}"
                        )));
                    }

                    let payload: Value = resp.json().map_err(|e| {
                        DataError::ResponseFormatChanged(format!(
                            "failed to parse klines for {symbol}: {e}"
                        ))
                    })?;
                    return parse_klines(&payload);
                }
                Err(e) => {
                    if e.is_connect() || e.is_timeout() {
                        last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(DataError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

impl DataProvider for BinanceProvider {
    fn name(&self) -> &str {
        "binance_spot"
    }

    fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, DataError> {
        let end_ms = end.timestamp_millis();
        let mut cursor = start.timestamp_millis();
        let mut bars: Vec<Bar> = Vec::new();
        let mut pages = 0usize;

        while cursor < end_ms {
            let page = self.fetch_page(symbol, interval, cursor, end_ms)?;
            let Some(last) = page.last() else {
                break;
            };
            let next = last.timestamp.timestamp_millis() + interval.millis();
            let full = page.len() >= PAGE_LIMIT;
            bars.extend(page);
            pages += 1;
            tracing::debug!(symbol, pages, bars = bars.len(), "fetched klines page");

            if !full || next <= cursor {
                break;
            }
            cursor = next;
            std::thread::sleep(self.page_delay);
        }

        if bars.is_empty() {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
            });
        }
        let bars = trim_to_range(bars, end);
        tracing::info!(symbol, %interval, bars = bars.len(), pages, "download complete");
        Ok(bars)
    }
}

/// Keep the downloaded range half-open at `end` and drop repeated open times.
///
/// Binance treats `endTime` as inclusive, so a kline opening exactly at `end`
/// is returned; it belongs to the next download instead.
fn trim_to_range(mut bars: Vec<Bar>, end: DateTime<Utc>) -> Vec<Bar> {
    bars.retain(|b| b.timestamp < end);
    bars.dedup_by_key(|b| b.timestamp);
    bars
}

/// Parse a klines payload: an array of
/// `[open_time, "open", "high", "low", "close", "volume", close_time, ...]`.
pub fn parse_klines(payload: &Value) -> Result<Vec<Bar>, DataError> {
    let rows = payload
        .as_array()
        .ok_or_else(|| DataError::ResponseFormatChanged("klines payload is not an array".into()))?;

    rows.iter()
        .enumerate()
        .map(|(i, row)| parse_kline(i, row))
        .collect()
}

fn parse_kline(index: usize, row: &Value) -> Result<Bar, DataError> {
    let fields = row
        .as_array()
        .filter(|f| f.len() >= 6)
        .ok_or_else(|| DataError::ResponseFormatChanged(format!("kline {index} is malformed")))?;

    let open_ms = fields[0]
        .as_i64()
        .ok_or_else(|| DataError::ResponseFormatChanged(format!("kline {index}: bad open time")))?;
    let timestamp = DateTime::from_timestamp_millis(open_ms).ok_or_else(|| {
        DataError::InvalidTimestamp {
            row: index,
            value: open_ms.to_string(),
        }
    })?;

    let number = |pos: usize, name: &str| -> Result<f64, DataError> {
        let value = &fields[pos];
        value
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .or_else(|| value.as_f64())
            .ok_or_else(|| DataError::ResponseFormatChanged(format!("kline {index}: bad {name}")))
    };

    let mut bar = Bar::new(
        timestamp,
        number(1, "open")?,
        number(2, "high")?,
        number(3, "low")?,
        number(4, "close")?,
    );
    bar.volume = number(5, "volume")?;
    Ok(bar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn parse_klines_reads_string_prices() {
        let payload = json!([
            [1514764800000i64, "13715.65", "13818.55", "13400.01", "13529.01", "443.356",
             1514768399999i64, "6.0e6", 5228, "228.5", "3.0e6", "0"],
            [1514768400000i64, "13528.99", "13595.89", "13155.38", "13203.06", "383.697",
             1514771999999i64, "5.1e6", 4534, "180.3", "2.4e6", "0"]
        ]);
        let bars = parse_klines(&payload).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp, Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(bars[0].open, 13715.65);
        assert_eq!(bars[1].close, 13203.06);
        assert_eq!(bars[1].volume, 383.697);
    }

    #[test]
    fn kline_opening_at_end_is_left_out() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let hour = chrono::Duration::hours(1);
        let bars: Vec<Bar> = [0, 1, 1, 2]
            .iter()
            .map(|&h| Bar::new(t0 + hour * h, 1.0, 1.0, 1.0, 1.0))
            .collect();
        let kept = trim_to_range(bars, t0 + hour * 2);
        let times: Vec<_> = kept.iter().map(|b| b.timestamp).collect();
        assert_eq!(times, vec![t0, t0 + hour]);
    }

    #[test]
    fn parse_klines_rejects_non_array() {
        let err = parse_klines(&json!({"code": -1121, "msg": "Invalid symbol."})).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }

    #[test]
    fn parse_klines_rejects_short_row() {
        let err = parse_klines(&json!([[1514764800000i64, "1.0"]])).unwrap_err();
        assert!(err.to_string().contains("kline 0"));
    }

    #[test]
    fn parse_klines_rejects_bad_price() {
        let payload = json!([[1514764800000i64, "abc", "2", "1", "1.5", "10"]]);
        let err = parse_klines(&payload).unwrap_err();
        assert!(err.to_string().contains("bad open"));
    }

    #[test]
    fn empty_payload_is_empty() {
        assert!(parse_klines(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn provider_builds() {
        let provider = BinanceProvider::new().unwrap();
        assert_eq!(provider.name(), "binance_spot");
    }
}
