//! Position — the single open leg the engine may hold.
//!
//! Modeled as an enum so that "flat", "long" and "short" are mutually
//! exclusive by construction: there is no way to represent two opposing
//! legs at once, and an entry price only exists while a leg is open.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Flat,
    Long,
    Short,
}

impl PositionSide {
    /// +1 for long, -1 for short, 0 when flat.
    pub fn sign(self) -> f64 {
        match self {
            Self::Flat => 0.0,
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }
}

/// An open leg: quantity is always positive, the side lives on `Position`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub quantity: f64,
    pub entry_price: f64,
    pub entry_bar: usize,
    pub entry_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Position {
    #[default]
    Flat,
    Long(Leg),
    Short(Leg),
}

impl Position {
    pub fn new_long(
        quantity: f64,
        entry_price: f64,
        entry_bar: usize,
        entry_time: DateTime<Utc>,
    ) -> Self {
        Self::Long(Leg {
            quantity,
            entry_price,
            entry_bar,
            entry_time,
        })
    }

    pub fn new_short(
        quantity: f64,
        entry_price: f64,
        entry_bar: usize,
        entry_time: DateTime<Utc>,
    ) -> Self {
        Self::Short(Leg {
            quantity,
            entry_price,
            entry_bar,
            entry_time,
        })
    }

    pub fn side(&self) -> PositionSide {
        match self {
            Self::Flat => PositionSide::Flat,
            Self::Long(_) => PositionSide::Long,
            Self::Short(_) => PositionSide::Short,
        }
    }

    pub fn leg(&self) -> Option<&Leg> {
        match self {
            Self::Flat => None,
            Self::Long(leg) | Self::Short(leg) => Some(leg),
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, Self::Flat)
    }

    /// Absolute quantity held (0 when flat).
    pub fn quantity(&self) -> f64 {
        self.leg().map_or(0.0, |leg| leg.quantity)
    }

    /// +qty for long, -qty for short, 0 when flat.
    pub fn signed_quantity(&self) -> f64 {
        self.side().sign() * self.quantity()
    }

    /// Mark-to-market contribution to equity at `price`.
    pub fn market_value(&self, price: f64) -> f64 {
        self.signed_quantity() * price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
    }

    #[test]
    fn flat_has_no_exposure() {
        let pos = Position::Flat;
        assert!(pos.is_flat());
        assert_eq!(pos.side(), PositionSide::Flat);
        assert_eq!(pos.quantity(), 0.0);
        assert_eq!(pos.market_value(100.0), 0.0);
    }

    #[test]
    fn long_market_value_is_positive() {
        let pos = Position::new_long(2.0, 100.0, 0, t0());
        assert_eq!(pos.signed_quantity(), 2.0);
        assert_eq!(pos.market_value(110.0), 220.0);
    }

    #[test]
    fn short_market_value_is_negative() {
        let pos = Position::new_short(2.0, 100.0, 3, t0());
        assert_eq!(pos.side(), PositionSide::Short);
        assert_eq!(pos.signed_quantity(), -2.0);
        assert_eq!(pos.market_value(90.0), -180.0);
        assert_eq!(pos.leg().map(|l| l.entry_bar), Some(3));
    }

    #[test]
    fn default_is_flat() {
        assert_eq!(Position::default(), Position::Flat);
    }
}
