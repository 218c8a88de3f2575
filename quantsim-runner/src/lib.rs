//! quantsim runner — metrics, walk-forward search, reporting, pipeline.
//!
//! This crate builds on `quantsim-core` to provide:
//! - Performance metrics (CAGR, MaxDD, Sharpe, Sortino, Calmar, WinRate)
//! - Single-backtest runner (signals → engine → metrics)
//! - Walk-forward Calmar objective with pruning
//! - Seeded parallel random search
//! - Period return tables and artifact export
//! - TOML configuration and the end-to-end optimize pipeline

pub mod config;
pub mod export;
pub mod metrics;
pub mod pipeline;
pub mod returns;
pub mod runner;
pub mod sweep;
pub mod walk_forward;

pub use config::{ConfigError, QuantsimConfig, SimulationConfig};
pub use metrics::PerformanceMetrics;
pub use pipeline::{optimize, run_pipeline, PipelineOutput};
pub use returns::{returns_table, Period, PeriodReturn};
pub use runner::{run_backtest, BacktestResult, RunError, StrategyParams};
pub use sweep::{random_search, SearchResult, SearchSpace, Trial};
pub use walk_forward::{evaluate_walk_forward, PruneReason, TrialOutcome, WalkForwardConfig};
