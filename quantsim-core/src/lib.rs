//! quantsim core — domain types, simulation engine, indicators, signals, data I/O.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (bars, positions, trades)
//! - Single-position bar-by-bar engine with SL/TP, signal exits and capped sizing
//! - Indicators (SMA, EMA, RSI, MACD) behind a common trait
//! - RSI / SMA / MACD 2-of-3 signal confirmation
//! - Binance klines download, CSV cache, chronological splits

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod signals;

pub use domain::{Bar, ExitReason, Position, PositionSide, TradeRecord};
pub use engine::{simulate, EngineError, EquityPoint, SimParams, SimulationResult};
pub use signals::{annotate_signals, SignalParams};
