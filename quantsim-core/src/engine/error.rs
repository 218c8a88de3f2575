use crate::domain::BarError;
use thiserror::Error;

/// Errors raised before a simulation starts. Nothing fails mid-run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid bar input: {0}")]
    InvalidBars(#[from] BarError),

    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParam {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}

impl EngineError {
    pub fn invalid_param(name: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidParam {
            name,
            value,
            reason,
        }
    }
}
