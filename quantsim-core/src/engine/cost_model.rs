//! Cost model — fee-aware cash flows and realized PnL.
//!
//! A single proportional fee is charged on the notional of every fill, on
//! both the opening and the closing side. Cash flows are signed deltas to
//! the cash ledger: buying debits `price·qty·(1+fee)`, selling credits
//! `price·qty·(1−fee)`.

use crate::domain::PositionSide;

/// Realized PnL of a closed leg, split into price movement and fees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RealizedPnl {
    pub gross: f64,
    pub fees: f64,
    pub net: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    /// Fee per side as a fraction of notional.
    pub fee_rate: f64,
}

impl CostModel {
    pub fn new(fee_rate: f64) -> Self {
        Self { fee_rate }
    }

    /// Cash cost of buying `quantity` at `price`, fee included.
    pub fn buy_cost(&self, price: f64, quantity: f64) -> f64 {
        price * quantity * (1.0 + self.fee_rate)
    }

    /// Cash proceeds of selling `quantity` at `price`, net of fee.
    pub fn sell_proceeds(&self, price: f64, quantity: f64) -> f64 {
        price * quantity * (1.0 - self.fee_rate)
    }

    /// Signed cash delta for opening a leg on `side`.
    ///
    /// Long opens buy; short opens sell and are credited the proceeds.
    pub fn open_cash_flow(&self, side: PositionSide, price: f64, quantity: f64) -> f64 {
        match side {
            PositionSide::Long => -self.buy_cost(price, quantity),
            PositionSide::Short => self.sell_proceeds(price, quantity),
            PositionSide::Flat => 0.0,
        }
    }

    /// Signed cash delta for closing a leg on `side`.
    pub fn close_cash_flow(&self, side: PositionSide, price: f64, quantity: f64) -> f64 {
        match side {
            PositionSide::Long => self.sell_proceeds(price, quantity),
            PositionSide::Short => -self.buy_cost(price, quantity),
            PositionSide::Flat => 0.0,
        }
    }

    /// `(exit−entry)·qty − exit·qty·fee − entry·qty·fee` for longs, mirrored for shorts.
    pub fn realized_pnl(
        &self,
        side: PositionSide,
        entry_price: f64,
        exit_price: f64,
        quantity: f64,
    ) -> RealizedPnl {
        let gross = match side {
            PositionSide::Long => (exit_price - entry_price) * quantity,
            PositionSide::Short => (entry_price - exit_price) * quantity,
            PositionSide::Flat => 0.0,
        };
        if side == PositionSide::Flat {
            return RealizedPnl {
                gross,
                fees: 0.0,
                net: gross,
            };
        }
        let exit_fee = exit_price * quantity * self.fee_rate;
        let entry_fee = entry_price * quantity * self.fee_rate;
        RealizedPnl {
            gross,
            fees: exit_fee + entry_fee,
            net: gross - exit_fee - entry_fee,
        }
    }
}
