//! Engine state, the per-bar step function, and the run result types.

use crate::domain::{Bar, ExitReason, Position, PositionSide, TradeRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cost_model::CostModel;
use super::exits::{level_exit, signal_exit, ExitFill, ExitOutcome};
use super::params::SimParams;
use super::sizing::entry_quantity;

/// Mark-to-market equity at a bar's close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

/// Mutable state threaded through the bar loop. One instance per simulation.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub cash: f64,
    pub position: Position,
    pub trades: Vec<TradeRecord>,
    pub equity: Vec<EquityPoint>,
    params: SimParams,
    cost: CostModel,
}

impl EngineState {
    pub fn new(params: SimParams) -> Self {
        Self::with_capacity(params, 0)
    }

    pub fn with_capacity(params: SimParams, bars: usize) -> Self {
        Self {
            cash: params.initial_cash,
            position: Position::Flat,
            trades: Vec::new(),
            equity: Vec::with_capacity(bars),
            params,
            cost: CostModel::new(params.fee_rate),
        }
    }

    /// Process one bar: level exit, signal exit, entry, equity sample.
    pub fn step(&mut self, index: usize, bar: &Bar) {
        let outcome = self.evaluate_level_exit(index, bar);
        if !outcome.is_closed() {
            self.evaluate_signal_exit(index, bar);
        }
        if self.position.is_flat() {
            self.try_enter(index, bar);
        }
        self.record_equity(bar);
    }

    /// Close the position if the bar touches its stop-loss or take-profit.
    pub fn evaluate_level_exit(&mut self, index: usize, bar: &Bar) -> ExitOutcome {
        if self.position.is_flat() {
            return ExitOutcome::NoPosition;
        }
        match level_exit(
            &self.position,
            bar,
            self.params.stop_loss,
            self.params.take_profit,
        ) {
            Some(fill) => {
                self.close(index, bar.timestamp, fill);
                ExitOutcome::Closed(fill.reason)
            }
            None => ExitOutcome::StillOpen,
        }
    }

    /// Close the position on an opposing signal at the bar's close.
    pub fn evaluate_signal_exit(&mut self, index: usize, bar: &Bar) -> ExitOutcome {
        if self.position.is_flat() {
            return ExitOutcome::NoPosition;
        }
        match signal_exit(&self.position, bar) {
            Some(fill) => {
                self.close(index, bar.timestamp, fill);
                ExitOutcome::Closed(fill.reason)
            }
            None => ExitOutcome::StillOpen,
        }
    }

    /// Open a position at the close when flat and a signal fired.
    ///
    /// Buy is checked before sell. Returns the side opened, if any.
    pub fn try_enter(&mut self, index: usize, bar: &Bar) -> Option<PositionSide> {
        if !self.position.is_flat() {
            return None;
        }
        let side = if bar.buy_signal {
            PositionSide::Long
        } else if bar.sell_signal {
            PositionSide::Short
        } else {
            return None;
        };

        let quantity = entry_quantity(self.cash, bar.close, &self.params)?;
        self.cash += self.cost.open_cash_flow(side, bar.close, quantity);
        self.position = match side {
            PositionSide::Long => Position::new_long(quantity, bar.close, index, bar.timestamp),
            _ => Position::new_short(quantity, bar.close, index, bar.timestamp),
        };
        tracing::trace!(bar = index, ?side, quantity, price = bar.close, "entry");
        Some(side)
    }

    /// Current mark-to-market equity at `price`.
    pub fn equity_at(&self, price: f64) -> f64 {
        self.cash + self.position.market_value(price)
    }

    pub fn record_equity(&mut self, bar: &Bar) {
        let equity = self.equity_at(bar.close);
        self.equity.push(EquityPoint {
            timestamp: bar.timestamp,
            equity,
        });
    }

    /// Close any open position at the last bar's close and rewrite the final
    /// equity point with the resulting cash.
    pub fn liquidate(&mut self, index: usize, bar: &Bar) -> bool {
        if self.position.is_flat() {
            return false;
        }
        self.close(
            index,
            bar.timestamp,
            ExitFill {
                reason: ExitReason::EndOfData,
                price: bar.close,
            },
        );
        if let Some(last) = self.equity.last_mut() {
            last.equity = self.cash;
        }
        true
    }

    pub fn into_result(self) -> SimulationResult {
        SimulationResult {
            equity: self.equity,
            trades: self.trades,
            final_cash: self.cash,
        }
    }

    fn close(&mut self, index: usize, time: DateTime<Utc>, fill: ExitFill) {
        let side = self.position.side();
        let Some(leg) = self.position.leg().copied() else {
            return;
        };
        self.cash += self.cost.close_cash_flow(side, fill.price, leg.quantity);
        let pnl = self
            .cost
            .realized_pnl(side, leg.entry_price, fill.price, leg.quantity);
        tracing::trace!(
            bar = index,
            ?side,
            reason = ?fill.reason,
            price = fill.price,
            pnl = pnl.net,
            "exit"
        );
        self.trades.push(TradeRecord {
            side,
            entry_bar: leg.entry_bar,
            entry_time: leg.entry_time,
            entry_price: leg.entry_price,
            exit_bar: index,
            exit_time: time,
            exit_price: fill.price,
            exit_reason: fill.reason,
            quantity: leg.quantity,
            gross_pnl: pnl.gross,
            fees: pnl.fees,
            pnl: pnl.net,
        });
        self.position = Position::Flat;
    }
}

/// Output of one simulation call: one equity point per bar plus every
/// completed trade, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub equity: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
    pub final_cash: f64,
}

impl SimulationResult {
    pub fn final_equity(&self) -> f64 {
        self.equity.last().map_or(f64::NAN, |p| p.equity)
    }

    pub fn equity_values(&self) -> Vec<f64> {
        self.equity.iter().map(|p| p.equity).collect()
    }
}
