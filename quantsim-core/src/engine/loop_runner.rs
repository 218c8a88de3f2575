//! Bar-by-bar simulation loop — the heart of the backtesting engine.
//!
//! Per bar, in order:
//! 1. Level exit: stop-loss / take-profit against the bar's High/Low
//! 2. Signal exit: opposing signal at Close, skipped if step 1 closed
//! 3. Entry: when flat, size and open on a buy (preferred) or sell signal
//! 4. Equity: cash + signed quantity · Close
//!
//! After the last bar an open position is liquidated at the last Close.

use crate::domain::{validate_bars, Bar};

use super::error::EngineError;
use super::params::SimParams;
use super::state::{EngineState, SimulationResult};

/// Run a simulation over signal-annotated bars.
///
/// Inputs are validated up front; once the loop starts nothing can fail.
/// The call is pure: no state survives it besides the returned result.
pub fn simulate(bars: &[Bar], params: &SimParams) -> Result<SimulationResult, EngineError> {
    params.validate()?;
    validate_bars(bars)?;

    let mut state = EngineState::with_capacity(*params, bars.len());
    for (index, bar) in bars.iter().enumerate() {
        state.step(index, bar);
    }

    let last_index = bars.len() - 1;
    if state.liquidate(last_index, &bars[last_index]) {
        tracing::trace!(bar = last_index, "liquidated open position at end of data");
    }

    let result = state.into_result();
    tracing::debug!(
        bars = bars.len(),
        trades = result.trades.len(),
        final_equity = result.final_equity(),
        "simulation complete"
    );
    Ok(result)
}
