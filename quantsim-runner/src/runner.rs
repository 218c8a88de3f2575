//! Backtest runner — wires together signals, engine, and metrics.
//!
//! Two entry points:
//! - `run_backtest()`: raw bars in, signals annotated, simulated, measured.
//! - `simulate_annotated()`: bars that already carry signal flags. Used by
//!   the walk-forward objective, which annotates once and simulates per chunk.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use quantsim_core::data::{dataset_hash, DataError};
use quantsim_core::domain::{Bar, TradeRecord};
use quantsim_core::engine::{EngineError, EquityPoint, SimParams, SimulationResult};
use quantsim_core::signals::{annotate_signals, SignalError, SignalParams};

use crate::config::{ConfigError, SimulationConfig};
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("signal error: {0}")]
    Signal(#[from] SignalError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("no bars left after a {warmup}-bar warmup ({bars} input bars)")]
    NoBarsAfterWarmup { bars: usize, warmup: usize },
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// One full strategy: signal parameters plus stop / target / size.
///
/// Serialized flat, with the short keys `sl`, `tp`, `n_shares`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    #[serde(flatten)]
    pub signal: SignalParams,
    #[serde(rename = "sl")]
    pub stop_loss: f64,
    #[serde(rename = "tp")]
    pub take_profit: f64,
    pub n_shares: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            signal: SignalParams::default(),
            stop_loss: 0.02,
            take_profit: 0.04,
            n_shares: 1.0,
        }
    }
}

impl StrategyParams {
    pub fn sim_params(&self, sim: &SimulationConfig) -> SimParams {
        sim.sim_params(self.stop_loss, self.take_profit, self.n_shares)
    }

    /// Check signal and engine parameters without touching any data.
    pub fn validate(&self, sim: &SimulationConfig) -> Result<(), RunError> {
        self.signal.validate()?;
        self.sim_params(sim).validate()?;
        Ok(())
    }
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub params: StrategyParams,
    pub metrics: PerformanceMetrics,
    pub trades: Vec<TradeRecord>,
    pub equity: Vec<EquityPoint>,
    pub dataset_hash: String,
    /// Input bars, before warmup removal.
    pub bar_count: usize,
    /// Bars the engine actually walked.
    pub simulated_bars: usize,
    pub buy_signals: usize,
    pub sell_signals: usize,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn equity_values(&self) -> Vec<f64> {
        self.equity.iter().map(|p| p.equity).collect()
    }
}

/// Annotate, simulate and measure one strategy over raw bars.
pub fn run_backtest(
    bars: &[Bar],
    params: &StrategyParams,
    sim: &SimulationConfig,
    periods_per_year: f64,
) -> Result<BacktestResult, RunError> {
    params.validate(sim)?;
    let annotated = annotate_signals(bars, &params.signal)?;
    if annotated.is_empty() {
        return Err(RunError::NoBarsAfterWarmup {
            bars: bars.len(),
            warmup: params.signal.warmup(),
        });
    }

    let result = simulate_annotated(&annotated, params, sim)?;
    let metrics = PerformanceMetrics::from_result(&result, periods_per_year);

    tracing::info!(
        bars = bars.len(),
        simulated = annotated.len(),
        trades = metrics.trades,
        final_equity = metrics.final_equity,
        calmar = metrics.calmar,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        params: *params,
        metrics,
        dataset_hash: dataset_hash(bars),
        bar_count: bars.len(),
        simulated_bars: annotated.len(),
        buy_signals: annotated.iter().filter(|b| b.buy_signal).count(),
        sell_signals: annotated.iter().filter(|b| b.sell_signal).count(),
        trades: result.trades,
        equity: result.equity,
    })
}

/// Simulate bars that already carry signal flags.
pub fn simulate_annotated(
    annotated: &[Bar],
    params: &StrategyParams,
    sim: &SimulationConfig,
) -> Result<SimulationResult, RunError> {
    Ok(quantsim_core::simulate(annotated, &params.sim_params(sim))?)
}
