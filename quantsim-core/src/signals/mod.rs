//! Signal generation — RSI / SMA / MACD votes with 2-of-3 confirmation.
//!
//! Signals depend on market data only. Each indicator casts a buy and a sell
//! vote per bar; a flag is raised when at least two of the three agree.
//! Bars where any indicator is still warming up are dropped from the output.

pub mod params;

pub use params::{SignalError, SignalParams};

use crate::domain::Bar;
use crate::indicators::{Indicator, IndicatorValues, Macd, Rsi, Sma};

/// Votes required for a signal to fire.
pub const CONFIRMATIONS: u8 = 2;

/// Per-bar buy and sell vote counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Votes {
    pub buy: u8,
    pub sell: u8,
}

impl Votes {
    pub fn buy_signal(self) -> bool {
        self.buy >= CONFIRMATIONS
    }

    pub fn sell_signal(self) -> bool {
        self.sell >= CONFIRMATIONS
    }
}

/// The five series the vote reads, computed once per parameter set.
struct VoteInputs {
    values: IndicatorValues,
    rsi: String,
    sma_fast: String,
    sma_slow: String,
    macd: String,
    macd_signal: String,
}

impl VoteInputs {
    fn compute(bars: &[Bar], params: &SignalParams) -> Self {
        let indicators: [Box<dyn Indicator>; 5] = [
            Box::new(Rsi::new(params.rsi_window)),
            Box::new(Sma::new(params.sma_fast)),
            Box::new(Sma::new(params.sma_slow)),
            Box::new(Macd::macd(params.macd_fast, params.macd_slow, params.macd_signal)),
            Box::new(Macd::signal(params.macd_fast, params.macd_slow, params.macd_signal)),
        ];
        let mut values = IndicatorValues::new();
        for indicator in &indicators {
            values.compute(indicator.as_ref(), bars);
        }
        let [rsi, sma_fast, sma_slow, macd, macd_signal] =
            indicators.map(|i| i.name().to_string());
        Self {
            values,
            rsi,
            sma_fast,
            sma_slow,
            macd,
            macd_signal,
        }
    }

    fn at(&self, name: &str, index: usize) -> f64 {
        self.values.get(name, index).unwrap_or(f64::NAN)
    }

    fn is_defined(&self, index: usize) -> bool {
        [
            &self.rsi,
            &self.sma_fast,
            &self.sma_slow,
            &self.macd,
            &self.macd_signal,
        ]
        .iter()
        .all(|name| !self.at(name, index).is_nan())
    }

    /// NaN comparisons are false, so undefined inputs never vote.
    fn votes(&self, index: usize, params: &SignalParams) -> Votes {
        let rsi = self.at(&self.rsi, index);
        let rsi_prev = match index {
            0 => f64::NAN,
            i => self.at(&self.rsi, i - 1),
        };
        let fast = self.at(&self.sma_fast, index);
        let slow = self.at(&self.sma_slow, index);
        let macd = self.at(&self.macd, index);
        let signal = self.at(&self.macd_signal, index);

        let buys = [
            rsi_prev >= params.rsi_low && rsi < params.rsi_low,
            fast > slow,
            macd > signal,
        ];
        let sells = [
            rsi_prev <= params.rsi_high && rsi > params.rsi_high,
            fast < slow,
            macd < signal,
        ];
        Votes {
            buy: buys.iter().filter(|&&v| v).count() as u8,
            sell: sells.iter().filter(|&&v| v).count() as u8,
        }
    }
}

/// Vote counts for every bar, including warmup bars (which cast no
/// indicator-dependent votes).
pub fn compute_votes(bars: &[Bar], params: &SignalParams) -> Result<Vec<Votes>, SignalError> {
    params.validate()?;
    let inputs = VoteInputs::compute(bars, params);
    Ok((0..bars.len()).map(|i| inputs.votes(i, params)).collect())
}

/// Annotate `bars` with buy/sell flags and drop the warmup prefix.
///
/// The output is a new bar sequence ready for the engine. It may be empty
/// when the input is shorter than the indicators' warmup.
pub fn annotate_signals(bars: &[Bar], params: &SignalParams) -> Result<Vec<Bar>, SignalError> {
    params.validate()?;
    let inputs = VoteInputs::compute(bars, params);

    let annotated: Vec<Bar> = bars
        .iter()
        .enumerate()
        .filter(|(i, _)| inputs.is_defined(*i))
        .map(|(i, bar)| {
            let votes = inputs.votes(i, params);
            bar.clone()
                .with_signals(votes.buy_signal(), votes.sell_signal())
        })
        .collect();

    tracing::debug!(
        input = bars.len(),
        output = annotated.len(),
        buys = annotated.iter().filter(|b| b.buy_signal).count(),
        sells = annotated.iter().filter(|b| b.sell_signal).count(),
        "annotated signals"
    );
    Ok(annotated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn small_params() -> SignalParams {
        SignalParams {
            rsi_window: 3,
            rsi_low: 30.0,
            rsi_high: 70.0,
            sma_fast: 2,
            sma_slow: 4,
            macd_fast: 2,
            macd_slow: 4,
            macd_signal: 2,
        }
    }

    fn zigzag(n: usize) -> Vec<Bar> {
        let closes: Vec<f64> = (0..n)
            .map(|i| 100.0 + (i as f64 * 0.9).sin() * 8.0 + i as f64 * 0.1)
            .collect();
        make_bars(&closes)
    }

    #[test]
    fn warmup_rows_are_dropped() {
        let bars = zigzag(30);
        let params = small_params();
        let out = annotate_signals(&bars, &params).unwrap();
        assert_eq!(out.len(), bars.len() - params.warmup());
        assert_eq!(out[0].timestamp, bars[params.warmup()].timestamp);
    }

    #[test]
    fn too_short_input_yields_empty_output() {
        let bars = zigzag(3);
        assert!(annotate_signals(&bars, &small_params()).unwrap().is_empty());
    }

    #[test]
    fn rising_series_votes_buy_on_trend_indicators() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + (i * i) as f64 * 0.5).collect();
        let bars = make_bars(&closes);
        let out = annotate_signals(&bars, &small_params()).unwrap();
        // SMA fast > slow and MACD > signal on an accelerating uptrend
        assert!(out.iter().all(|b| b.buy_signal && !b.sell_signal));
    }

    #[test]
    fn falling_series_votes_sell() {
        let closes: Vec<f64> = (0..20).map(|i| 400.0 - (i * i) as f64 * 0.5).collect();
        let bars = make_bars(&closes);
        let out = annotate_signals(&bars, &small_params()).unwrap();
        assert!(out.iter().all(|b| b.sell_signal && !b.buy_signal));
    }

    #[test]
    fn buy_and_sell_never_both_fire() {
        let bars = zigzag(200);
        let votes = compute_votes(&bars, &small_params()).unwrap();
        for v in votes {
            assert!(v.buy + v.sell <= 3);
            assert!(!(v.buy_signal() && v.sell_signal()));
        }
    }

    #[test]
    fn invalid_params_are_rejected() {
        let params = SignalParams {
            sma_fast: 4,
            sma_slow: 4,
            ..small_params()
        };
        assert!(annotate_signals(&zigzag(30), &params).is_err());
    }

    #[test]
    fn votes_threshold() {
        assert!(Votes { buy: 2, sell: 0 }.buy_signal());
        assert!(!Votes { buy: 1, sell: 1 }.buy_signal());
        assert!(Votes { buy: 0, sell: 3 }.sell_signal());
    }
}
