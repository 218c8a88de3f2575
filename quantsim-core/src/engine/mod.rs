//! Backtesting engine — single-position, bar-by-bar simulation.
//!
//! The engine consumes signal-annotated bars and a `SimParams` set, walks the
//! bars once, and returns the equity curve and trade list. Exit logic always
//! runs before entry logic on the same bar.

pub mod cost_model;
pub mod error;
pub mod exits;
pub mod loop_runner;
pub mod params;
pub mod sizing;
pub mod state;

pub use cost_model::{CostModel, RealizedPnl};
pub use error::EngineError;
pub use exits::{exit_levels, level_exit, signal_exit, ExitFill, ExitOutcome};
pub use loop_runner::simulate;
pub use params::SimParams;
pub use sizing::{entry_quantity, floor_lot, LOT_SCALE};
pub use state::{EngineState, EquityPoint, SimulationResult};
