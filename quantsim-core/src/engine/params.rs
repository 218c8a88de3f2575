//! Simulation parameters and their validation.

use super::error::EngineError;
use serde::{Deserialize, Serialize};

/// Fee charged per side, as a fraction of notional (0.125%).
pub const DEFAULT_FEE_RATE: f64 = 0.00125;
pub const DEFAULT_INITIAL_CASH: f64 = 100_000.0;
pub const DEFAULT_MAX_NOTIONAL: f64 = 1_000_000.0;
/// Smallest quantity the engine will ever hold.
pub const DEFAULT_MIN_QUANTITY: f64 = 0.1;

/// Risk and sizing parameters for one simulation call.
///
/// `stop_loss` and `take_profit` are fractional distances from the entry
/// price (0.01 = 1%). `target_quantity` is the requested size; the sizer
/// trims it to what cash and the notional cap allow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    pub stop_loss: f64,
    pub take_profit: f64,
    pub target_quantity: f64,
    pub fee_rate: f64,
    pub initial_cash: f64,
    pub max_notional: f64,
    pub min_quantity: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            stop_loss: 0.02,
            take_profit: 0.04,
            target_quantity: 1.0,
            fee_rate: DEFAULT_FEE_RATE,
            initial_cash: DEFAULT_INITIAL_CASH,
            max_notional: DEFAULT_MAX_NOTIONAL,
            min_quantity: DEFAULT_MIN_QUANTITY,
        }
    }
}

impl SimParams {
    /// Default capital settings with the given SL/TP and requested size.
    pub fn new(stop_loss: f64, take_profit: f64, target_quantity: f64) -> Self {
        Self {
            stop_loss,
            take_profit,
            target_quantity,
            ..Self::default()
        }
    }

    pub fn with_fee_rate(mut self, fee_rate: f64) -> Self {
        self.fee_rate = fee_rate;
        self
    }

    pub fn with_initial_cash(mut self, initial_cash: f64) -> Self {
        self.initial_cash = initial_cash;
        self
    }

    pub fn with_max_notional(mut self, max_notional: f64) -> Self {
        self.max_notional = max_notional;
        self
    }

    pub fn with_min_quantity(mut self, min_quantity: f64) -> Self {
        self.min_quantity = min_quantity;
        self
    }

    /// Reject out-of-range parameters before any bar is processed.
    pub fn validate(&self) -> Result<(), EngineError> {
        check_open_unit("stop_loss", self.stop_loss)?;
        check_open_unit("take_profit", self.take_profit)?;
        check_positive("target_quantity", self.target_quantity)?;
        if !self.fee_rate.is_finite() || !(0.0..1.0).contains(&self.fee_rate) {
            return Err(EngineError::invalid_param(
                "fee_rate",
                self.fee_rate,
                "must be in [0, 1)",
            ));
        }
        check_positive("initial_cash", self.initial_cash)?;
        check_positive("max_notional", self.max_notional)?;
        check_positive("min_quantity", self.min_quantity)?;
        Ok(())
    }
}

fn check_open_unit(name: &'static str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() && value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(EngineError::invalid_param(name, value, "must be in (0, 1)"))
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::invalid_param(name, value, "must be positive"))
    }
}
