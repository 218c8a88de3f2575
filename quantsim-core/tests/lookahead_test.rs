//! Look-ahead contamination tests for indicators and signals.
//!
//! No value at bar t may depend on price data from bar t+1 or later.
//!
//! Method: compute on a truncated series (bars 0..150) and on the full series
//! (bars 0..300) and assert the overlapping prefix is identical.

use chrono::{Duration, TimeZone, Utc};
use quantsim_core::domain::Bar;
use quantsim_core::indicators::{Ema, Indicator, Macd, Rsi, Sma};
use quantsim_core::signals::{annotate_signals, compute_votes, SignalParams};

/// Deterministic pseudo-random walk.
fn make_test_bars(n: usize) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let mut price = 100.0;
    (0..n)
        .map(|i| {
            let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
            let change = ((seed % 200) as f64 - 100.0) * 0.05;
            price = (price + change).max(10.0);
            let open = price - 0.5;
            let close = price + 0.3;
            let high = open.max(close) + 2.0;
            let low = open.min(close) - 2.0;
            Bar::new(base + Duration::hours(i as i64), open, high, low, close)
        })
        .collect()
}

fn assert_no_lookahead(indicator: &dyn Indicator, full_bars: &[Bar], truncated_len: usize) {
    let full = indicator.compute(full_bars);
    let truncated = indicator.compute(&full_bars[..truncated_len]);
    assert_eq!(truncated.len(), truncated_len, "{}: length mismatch", indicator.name());

    for i in 0..truncated_len {
        let (a, b) = (truncated[i], full[i]);
        assert!(
            (a.is_nan() && b.is_nan()) || a == b,
            "{}: look-ahead at bar {i}: truncated={a}, full={b}",
            indicator.name()
        );
    }
}

#[test]
fn indicators_never_look_ahead() {
    let bars = make_test_bars(300);
    let indicators: Vec<Box<dyn Indicator>> = vec![
        Box::new(Sma::new(20)),
        Box::new(Sma::new(100)),
        Box::new(Ema::new(12)),
        Box::new(Rsi::new(14)),
        Box::new(Macd::macd(12, 26, 9)),
        Box::new(Macd::signal(12, 26, 9)),
        Box::new(Macd::histogram(12, 26, 9)),
    ];
    for indicator in &indicators {
        assert_no_lookahead(indicator.as_ref(), &bars, 150);
    }
}

#[test]
fn indicator_warmup_matches_lookback() {
    let bars = make_test_bars(200);
    let indicators: Vec<Box<dyn Indicator>> = vec![
        Box::new(Sma::new(20)),
        Box::new(Ema::new(12)),
        Box::new(Rsi::new(14)),
        Box::new(Macd::macd(12, 26, 9)),
        Box::new(Macd::signal(12, 26, 9)),
    ];
    for indicator in &indicators {
        let values = indicator.compute(&bars);
        let lookback = indicator.lookback();
        assert!(
            values[..lookback].iter().all(|v| v.is_nan()),
            "{}: value before lookback",
            indicator.name()
        );
        assert!(values[lookback].is_finite(), "{}: NaN at lookback", indicator.name());
    }
}

#[test]
fn signal_votes_never_look_ahead() {
    let bars = make_test_bars(300);
    let params = SignalParams::default();
    let full = compute_votes(&bars, &params).unwrap();
    let truncated = compute_votes(&bars[..180], &params).unwrap();
    assert_eq!(&full[..180], truncated.as_slice());
}

#[test]
fn annotated_prefix_is_stable() {
    let bars = make_test_bars(300);
    let params = SignalParams {
        rsi_window: 10,
        rsi_low: 35.0,
        rsi_high: 65.0,
        sma_fast: 10,
        sma_slow: 60,
        macd_fast: 8,
        macd_slow: 20,
        macd_signal: 6,
    };
    let full = annotate_signals(&bars, &params).unwrap();
    let truncated = annotate_signals(&bars[..200], &params).unwrap();
    assert_eq!(truncated.len(), 200 - params.warmup());
    assert_eq!(&full[..truncated.len()], truncated.as_slice());
}
