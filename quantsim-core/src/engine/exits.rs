//! Exit evaluation — stop-loss / take-profit levels and opposing signals.
//!
//! Level exits are checked against the bar's High/Low before anything else
//! happens on that bar. When both levels are touched the stop wins; OHLC data
//! carries no intrabar ordering, so the conservative fill is assumed.

use crate::domain::{Bar, ExitReason, Position};
use serde::{Deserialize, Serialize};

/// Result of the exit step for one bar.
///
/// `Closed` suppresses the signal exit for the rest of the bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitOutcome {
    NoPosition,
    StillOpen,
    Closed(ExitReason),
}

impl ExitOutcome {
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

/// A triggered exit and the price it fills at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitFill {
    pub reason: ExitReason,
    pub price: f64,
}

/// Stop-loss and take-profit prices for a position, as `(sl, tp)`.
pub fn exit_levels(position: &Position, stop_loss: f64, take_profit: f64) -> Option<(f64, f64)> {
    match position {
        Position::Flat => None,
        Position::Long(leg) => Some((
            leg.entry_price * (1.0 - stop_loss),
            leg.entry_price * (1.0 + take_profit),
        )),
        Position::Short(leg) => Some((
            leg.entry_price * (1.0 + stop_loss),
            leg.entry_price * (1.0 - take_profit),
        )),
    }
}

/// Check the bar's range against the position's SL/TP levels.
///
/// Fills at the triggered level itself, also when the bar gapped past it.
pub fn level_exit(
    position: &Position,
    bar: &Bar,
    stop_loss: f64,
    take_profit: f64,
) -> Option<ExitFill> {
    let (sl_price, tp_price) = exit_levels(position, stop_loss, take_profit)?;

    let reason = match position {
        Position::Flat => return None,
        Position::Long(_) => {
            if bar.low <= sl_price {
                ExitReason::StopLoss
            } else if bar.high >= tp_price {
                ExitReason::TakeProfit
            } else {
                return None;
            }
        }
        Position::Short(_) => {
            if bar.high >= sl_price {
                ExitReason::StopLoss
            } else if bar.low <= tp_price {
                ExitReason::TakeProfit
            } else {
                return None;
            }
        }
    };

    let price = match reason {
        ExitReason::StopLoss => sl_price,
        _ => tp_price,
    };
    Some(ExitFill { reason, price })
}

/// Opposing-signal exit at the bar's close.
pub fn signal_exit(position: &Position, bar: &Bar) -> Option<ExitFill> {
    let triggered = match position {
        Position::Flat => false,
        Position::Long(_) => bar.sell_signal,
        Position::Short(_) => bar.buy_signal,
    };
    triggered.then_some(ExitFill {
        reason: ExitReason::Signal,
        price: bar.close,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar::new(
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            open,
            high,
            low,
            close,
        )
    }

    fn long_at(price: f64) -> Position {
        Position::new_long(1.0, price, 0, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    fn short_at(price: f64) -> Position {
        Position::new_short(1.0, price, 0, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    // ── Long ──

    #[test]
    fn long_inside_range_stays_open() {
        assert_eq!(level_exit(&long_at(100.0), &bar(100.0, 109.0, 96.0, 101.0), 0.05, 0.10), None);
    }

    #[test]
    fn long_stop_fills_at_level() {
        let fill = level_exit(&long_at(100.0), &bar(99.0, 101.0, 94.0, 96.0), 0.05, 0.10).unwrap();
        assert_eq!(fill.reason, ExitReason::StopLoss);
        assert!((fill.price - 95.0).abs() < 1e-10);
    }

    #[test]
    fn long_take_profit_fills_at_level() {
        let fill = level_exit(&long_at(100.0), &bar(105.0, 112.0, 104.0, 111.0), 0.05, 0.10).unwrap();
        assert_eq!(fill.reason, ExitReason::TakeProfit);
        assert!((fill.price - 110.0).abs() < 1e-9);
    }

    #[test]
    fn long_both_touched_prefers_stop() {
        let fill = level_exit(&long_at(100.0), &bar(100.0, 120.0, 80.0, 100.0), 0.05, 0.10).unwrap();
        assert_eq!(fill.reason, ExitReason::StopLoss);
    }

    #[test]
    fn long_gap_below_stop_fills_at_stop_level() {
        let b = bar(88.0, 90.0, 85.0, 86.0);
        let fill = level_exit(&long_at(100.0), &b, 0.05, 0.10).unwrap();
        assert_eq!(fill.reason, ExitReason::StopLoss);
        assert!((fill.price - 95.0).abs() < 1e-10);
    }

    #[test]
    fn long_gap_above_target_fills_at_target_level() {
        let b = bar(125.0, 130.0, 120.0, 128.0);
        let fill = level_exit(&long_at(100.0), &b, 0.05, 0.10).unwrap();
        assert_eq!(fill.reason, ExitReason::TakeProfit);
        assert!((fill.price - 110.0).abs() < 1e-9);
    }

    // ── Short ──

    #[test]
    fn short_stop_is_above_entry() {
        let fill = level_exit(&short_at(100.0), &bar(101.0, 106.0, 100.0, 104.0), 0.05, 0.10).unwrap();
        assert_eq!(fill.reason, ExitReason::StopLoss);
        assert!((fill.price - 105.0).abs() < 1e-10);
    }

    #[test]
    fn short_take_profit_is_below_entry() {
        let fill = level_exit(&short_at(100.0), &bar(95.0, 99.0, 88.0, 90.0), 0.05, 0.10).unwrap();
        assert_eq!(fill.reason, ExitReason::TakeProfit);
        assert!((fill.price - 90.0).abs() < 1e-10);
    }

    #[test]
    fn short_gap_through_stop_fills_at_stop_level() {
        let b = bar(115.0, 118.0, 112.0, 116.0);
        let fill = level_exit(&short_at(100.0), &b, 0.05, 0.10).unwrap();
        assert_eq!(fill.reason, ExitReason::StopLoss);
        assert!((fill.price - 105.0).abs() < 1e-10);
    }

    // ── Signal ──

    #[test]
    fn flat_never_exits() {
        let b = bar(100.0, 200.0, 1.0, 100.0).with_signals(true, true);
        assert_eq!(level_exit(&Position::Flat, &b, 0.05, 0.10), None);
        assert_eq!(signal_exit(&Position::Flat, &b), None);
    }

    #[test]
    fn long_exits_on_sell_signal_at_close() {
        let b = bar(100.0, 101.0, 99.0, 100.5).with_signals(false, true);
        let fill = signal_exit(&long_at(100.0), &b).unwrap();
        assert_eq!(fill.reason, ExitReason::Signal);
        assert_eq!(fill.price, 100.5);
    }

    #[test]
    fn long_ignores_buy_signal() {
        let b = bar(100.0, 101.0, 99.0, 100.5).with_signals(true, false);
        assert_eq!(signal_exit(&long_at(100.0), &b), None);
    }

    #[test]
    fn short_exits_on_buy_signal() {
        let b = bar(100.0, 101.0, 99.0, 99.5).with_signals(true, false);
        assert_eq!(signal_exit(&short_at(100.0), &b).map(|f| f.price), Some(99.5));
    }

    #[test]
    fn outcome_closed_flag() {
        assert!(ExitOutcome::Closed(ExitReason::StopLoss).is_closed());
        assert!(!ExitOutcome::StillOpen.is_closed());
        assert!(!ExitOutcome::NoPosition.is_closed());
    }
}
