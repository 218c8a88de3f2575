//! Walk-forward objective — contiguous chunk evaluation of one strategy.
//!
//! The signal-annotated training set is cut into `n_splits` contiguous,
//! non-overlapping chunks. Each chunk is simulated from a fresh account and
//! scored by its Calmar ratio; the trial score is the mean chunk Calmar.
//!
//! A trial is pruned (not scored) when:
//! - the parameters are invalid (fast >= slow for SMA or MACD, ...)
//! - the annotated set is shorter than `n_splits * min_bars_per_split`
//! - any chunk is shorter than `min_chunk_bars`
//! - any chunk trades fewer than `min_trades_per_chunk` times
//! - any chunk's Calmar is undefined

use std::ops::Range;

use serde::{Deserialize, Serialize};

use quantsim_core::domain::Bar;
use quantsim_core::signals::annotate_signals;

use crate::config::SimulationConfig;
use crate::metrics::{cagr, calmar_ratio, max_drawdown};
use crate::runner::{simulate_annotated, StrategyParams};

// ─── Configuration ───────────────────────────────────────────────────

/// Configuration for walk-forward scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    /// Number of chunks (default 5).
    pub n_splits: usize,
    /// Annotated bars required per chunk on average (default 200).
    pub min_bars_per_split: usize,
    /// Hard floor on any single chunk (default 100).
    pub min_chunk_bars: usize,
    /// Minimum activity per chunk (default 15 trades).
    pub min_trades_per_chunk: usize,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            n_splits: 5,
            min_bars_per_split: 200,
            min_chunk_bars: 100,
            min_trades_per_chunk: 15,
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Why a trial was not scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PruneReason {
    InvalidParams { message: String },
    TooFewBars { bars: usize, required: usize },
    ShortChunk { chunk: usize, bars: usize, required: usize },
    TooFewTrades { chunk: usize, trades: usize, required: usize },
    UndefinedCalmar { chunk: usize },
    Engine { message: String },
}

impl std::fmt::Display for PruneReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidParams { message } => write!(f, "invalid params: {message}"),
            Self::TooFewBars { bars, required } => {
                write!(f, "{bars} annotated bars < {required} required")
            }
            Self::ShortChunk {
                chunk,
                bars,
                required,
            } => write!(f, "chunk {chunk} has {bars} bars < {required}"),
            Self::TooFewTrades {
                chunk,
                trades,
                required,
            } => write!(f, "chunk {chunk} has {trades} trades < {required}"),
            Self::UndefinedCalmar { chunk } => write!(f, "chunk {chunk} has undefined Calmar"),
            Self::Engine { message } => write!(f, "engine error: {message}"),
        }
    }
}

/// Outcome of evaluating one parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TrialOutcome {
    Completed { score: f64, chunk_calmars: Vec<f64> },
    Pruned(PruneReason),
}

impl TrialOutcome {
    pub fn score(&self) -> Option<f64> {
        match self {
            Self::Completed { score, .. } => Some(*score),
            Self::Pruned(_) => None,
        }
    }

    pub fn is_pruned(&self) -> bool {
        matches!(self, Self::Pruned(_))
    }
}

// ─── Chunking ────────────────────────────────────────────────────────

/// Split `len` items into `n` contiguous ranges; the first `len % n` ranges
/// get one extra item.
pub fn chunk_bounds(len: usize, n: usize) -> Vec<Range<usize>> {
    if n == 0 {
        return Vec::new();
    }
    let base = len / n;
    let extra = len % n;
    let mut start = 0;
    (0..n)
        .map(|i| {
            let size = base + usize::from(i < extra);
            let range = start..start + size;
            start += size;
            range
        })
        .collect()
}

// ─── Objective ───────────────────────────────────────────────────────

/// Score one strategy on the training bars.
pub fn evaluate_walk_forward(
    train: &[Bar],
    params: &StrategyParams,
    sim: &SimulationConfig,
    config: &WalkForwardConfig,
) -> TrialOutcome {
    if let Err(e) = params.validate(sim) {
        return TrialOutcome::Pruned(PruneReason::InvalidParams {
            message: e.to_string(),
        });
    }
    let annotated = match annotate_signals(train, &params.signal) {
        Ok(bars) => bars,
        Err(e) => {
            return TrialOutcome::Pruned(PruneReason::InvalidParams {
                message: e.to_string(),
            })
        }
    };

    let required = config.n_splits * config.min_bars_per_split;
    if annotated.len() < required {
        return TrialOutcome::Pruned(PruneReason::TooFewBars {
            bars: annotated.len(),
            required,
        });
    }

    let mut chunk_calmars = Vec::with_capacity(config.n_splits);
    for (chunk, range) in chunk_bounds(annotated.len(), config.n_splits).into_iter().enumerate() {
        let bars = &annotated[range];
        if bars.len() < config.min_chunk_bars || bars.is_empty() {
            return TrialOutcome::Pruned(PruneReason::ShortChunk {
                chunk,
                bars: bars.len(),
                required: config.min_chunk_bars,
            });
        }

        let result = match simulate_annotated(bars, params, sim) {
            Ok(result) => result,
            Err(e) => {
                return TrialOutcome::Pruned(PruneReason::Engine {
                    message: e.to_string(),
                })
            }
        };
        if result.trades.len() < config.min_trades_per_chunk {
            return TrialOutcome::Pruned(PruneReason::TooFewTrades {
                chunk,
                trades: result.trades.len(),
                required: config.min_trades_per_chunk,
            });
        }

        let calmar = calmar_ratio(cagr(&result.equity), max_drawdown(&result.equity_values()));
        if calmar.is_nan() {
            return TrialOutcome::Pruned(PruneReason::UndefinedCalmar { chunk });
        }
        chunk_calmars.push(calmar);
    }

    let score = chunk_calmars.iter().sum::<f64>() / chunk_calmars.len() as f64;
    tracing::trace!(score, chunks = chunk_calmars.len(), "trial completed");
    TrialOutcome::Completed {
        score,
        chunk_calmars,
    }
}
