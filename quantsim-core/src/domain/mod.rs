//! Domain types for quantsim

pub mod bar;
pub mod position;
pub mod trade;

pub use bar::{validate_bars, Bar, BarError};
pub use position::{Leg, Position, PositionSide};
pub use trade::{ExitReason, TradeRecord};
