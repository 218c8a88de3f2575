//! End-to-end engine scenarios with hand-computed expectations.

use chrono::{DateTime, Duration, TimeZone, Utc};
use quantsim_core::domain::{Bar, ExitReason, PositionSide};
use quantsim_core::engine::{simulate, EngineError, EngineState, SimParams};

const FEE: f64 = 0.00125;
const EPS: f64 = 1e-9;

fn t(hour: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
}

fn bar(hour: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar::new(t(hour), open, high, low, close)
}

fn params() -> SimParams {
    SimParams::new(0.05, 0.10, 1.0)
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < EPS,
        "actual={actual}, expected={expected}"
    );
}

// ── Literal scenarios ────────────────────────────────────────────────

#[test]
fn single_bar_entry_state() {
    let b = bar(0, 100.0, 105.0, 95.0, 100.0).with_signals(true, false);
    let mut state = EngineState::new(params());
    state.step(0, &b);

    assert_eq!(state.position.side(), PositionSide::Long);
    assert_close(state.position.quantity(), 1.0);
    assert_close(state.cash, 99_899.875);
    assert_close(state.equity[0].equity, 99_999.875);
}

#[test]
fn single_bar_simulation_liquidates_at_same_close() {
    let bars = vec![bar(0, 100.0, 105.0, 95.0, 100.0).with_signals(true, false)];
    let result = simulate(&bars, &params()).unwrap();

    assert_eq!(result.equity.len(), 1);
    assert_eq!(result.trades.len(), 1);
    // Zero price move: the trade costs exactly both fee legs.
    assert_close(result.trades[0].pnl, -2.0 * FEE * 100.0 * 1.0);
    assert_close(result.final_equity(), 99_899.875 + 100.0 * (1.0 - FEE));
    assert_eq!(result.final_equity(), result.final_cash);
}

#[test]
fn forced_liquidation_scenario() {
    let bars = vec![
        bar(0, 100.0, 105.0, 95.0, 100.0).with_signals(true, false),
        bar(1, 105.0, 110.0, 104.0, 110.0),
    ];
    let result = simulate(&bars, &params()).unwrap();

    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.exit_reason, ExitReason::EndOfData);
    assert_eq!(trade.entry_bar, 0);
    assert_eq!(trade.exit_bar, 1);
    assert_close(trade.pnl, 9.7375);
    assert_close(result.final_cash, 100_009.7375);
    assert_eq!(result.final_equity(), result.final_cash);
    // First point is untouched mark-to-market
    assert_close(result.equity[0].equity, 99_999.875);
}

#[test]
fn no_signals_keeps_cash() {
    let bars: Vec<Bar> = (0..50)
        .map(|i| {
            let c = 100.0 + (i as f64 * 0.3).sin() * 5.0;
            bar(i, c, c + 2.0, c - 2.0, c)
        })
        .collect();
    let result = simulate(&bars, &params()).unwrap();
    assert_eq!(result.equity.len(), 50);
    assert!(result.trades.is_empty());
    assert!(result.equity.iter().all(|p| p.equity == 100_000.0));
}

// ── Exits ────────────────────────────────────────────────────────────

#[test]
fn long_stop_loss_realizes_loss() {
    let bars = vec![
        bar(0, 100.0, 101.0, 99.0, 100.0).with_signals(true, false),
        bar(1, 99.0, 99.5, 94.0, 96.0),
        bar(2, 96.0, 97.0, 95.5, 96.5),
    ];
    let result = simulate(&bars, &params()).unwrap();
    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.exit_reason, ExitReason::StopLoss);
    assert_close(trade.exit_price, 95.0);
    assert_close(trade.pnl, -5.0 - 95.0 * FEE - 100.0 * FEE);
    // Flat after the stop: equity == cash from bar 1 on
    assert_close(result.equity[1].equity, result.equity[2].equity);
}

#[test]
fn stop_loss_wins_when_both_levels_touched() {
    let bars = vec![
        bar(0, 100.0, 101.0, 99.0, 100.0).with_signals(true, false),
        bar(1, 100.0, 115.0, 90.0, 100.0),
    ];
    let result = simulate(&bars, &params()).unwrap();
    assert_eq!(result.trades[0].exit_reason, ExitReason::StopLoss);
}

#[test]
fn short_take_profit() {
    let bars = vec![
        bar(0, 100.0, 101.0, 99.0, 100.0).with_signals(false, true),
        bar(1, 95.0, 96.0, 89.0, 91.0),
    ];
    let result = simulate(&bars, &params()).unwrap();
    let trade = &result.trades[0];
    assert_eq!(trade.side, PositionSide::Short);
    assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
    assert_close(trade.exit_price, 90.0);
    assert_close(trade.pnl, 10.0 - 90.0 * FEE - 100.0 * FEE);
    // open credits 100·0.99875, close debits 90·1.00125
    assert_close(result.final_cash, 100_000.0 + 99.875 - 90.1125);
}

#[test]
fn level_exit_suppresses_signal_exit_on_same_bar() {
    let bars = vec![
        bar(0, 100.0, 101.0, 99.0, 100.0).with_signals(true, false),
        bar(1, 100.0, 111.0, 99.0, 108.0).with_signals(false, true),
    ];
    let result = simulate(&bars, &params()).unwrap();
    // TP closes; the sell signal then opens a short (which is liquidated),
    // but never produces a second exit of the long.
    assert_eq!(result.trades[0].exit_reason, ExitReason::TakeProfit);
    assert_eq!(result.trades.len(), 2);
    assert_eq!(result.trades[1].side, PositionSide::Short);
    assert_eq!(result.trades[1].exit_reason, ExitReason::EndOfData);
}

#[test]
fn opposing_signal_exits_at_close() {
    let bars = vec![
        bar(0, 100.0, 101.0, 99.0, 100.0).with_signals(true, false),
        bar(1, 100.0, 103.0, 99.0, 102.0).with_signals(false, true),
        bar(2, 102.0, 103.0, 101.0, 102.0),
    ];
    let result = simulate(&bars, &params()).unwrap();
    assert_eq!(result.trades[0].exit_reason, ExitReason::Signal);
    assert_close(result.trades[0].exit_price, 102.0);
}

#[test]
fn gap_through_stop_fills_at_stop_level() {
    let bars = vec![
        bar(0, 100.0, 101.0, 99.0, 100.0).with_signals(true, false),
        bar(1, 88.0, 90.0, 85.0, 86.0),
    ];
    let result = simulate(&bars, &params()).unwrap();
    let trade = &result.trades[0];
    assert_eq!(trade.exit_reason, ExitReason::StopLoss);
    assert_close(trade.exit_price, 95.0);
    // (95 - 100) - 95·fee - 100·fee
    assert_close(trade.pnl, -5.24375);
}

// ── Sizing ───────────────────────────────────────────────────────────

#[test]
fn quantity_below_minimum_opens_nothing() {
    let p = params().with_initial_cash(5_000.0);
    // 5000 / (100_000 · 1.00125) ≈ 0.0499 < 0.1
    let bars = vec![bar(0, 100_000.0, 100_100.0, 99_900.0, 100_000.0).with_signals(true, false)];
    let result = simulate(&bars, &p).unwrap();
    assert!(result.trades.is_empty());
    assert_eq!(result.final_equity(), 5_000.0);
}

#[test]
fn quantity_exactly_at_minimum_opens() {
    let p = SimParams::new(0.05, 0.10, 0.1);
    let b = bar(0, 100.0, 101.0, 99.0, 100.0).with_signals(true, false);
    let mut state = EngineState::new(p);
    state.step(0, &b);
    assert_close(state.position.quantity(), 0.1);
}

#[test]
fn notional_cap_limits_quantity() {
    let p = SimParams::new(0.05, 0.10, 5.0)
        .with_initial_cash(10_000_000.0)
        .with_max_notional(250_000.0);
    let b = bar(0, 100_000.0, 100_500.0, 99_500.0, 100_000.0).with_signals(true, false);
    let mut state = EngineState::new(p);
    state.step(0, &b);
    assert_close(state.position.quantity(), 2.5);
}

#[test]
fn cash_limits_quantity_and_truncates_to_lots() {
    let p = SimParams::new(0.05, 0.10, 5.0).with_initial_cash(300.0);
    let b = bar(0, 100.0, 101.0, 99.0, 100.0).with_signals(true, false);
    let mut state = EngineState::new(p);
    state.step(0, &b);
    // 300 / 100.125 = 2.99625468… → 2.996254
    assert_eq!(state.position.quantity(), 2.996_254);
    assert!(state.cash >= 0.0);
}

#[test]
fn short_is_funded_from_cash_only() {
    let p = SimParams::new(0.05, 0.10, 5.0).with_initial_cash(300.0);
    let b = bar(0, 100.0, 101.0, 99.0, 100.0).with_signals(false, true);
    let mut state = EngineState::new(p);
    state.step(0, &b);
    assert_eq!(state.position.side(), PositionSide::Short);
    assert_eq!(state.position.quantity(), 2.996_254);
}

// ── Validation ───────────────────────────────────────────────────────

#[test]
fn rejects_non_increasing_timestamps() {
    let bars = vec![bar(1, 100.0, 101.0, 99.0, 100.0), bar(0, 100.0, 101.0, 99.0, 100.0)];
    let err = simulate(&bars, &params()).unwrap_err();
    assert!(err.to_string().contains("strictly increasing"));
}

#[test]
fn rejects_non_positive_cash() {
    let bars = vec![bar(0, 100.0, 101.0, 99.0, 100.0)];
    let err = simulate(&bars, &params().with_initial_cash(-1.0)).unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidParam {
            name: "initial_cash",
            ..
        }
    ));
}

#[test]
fn repeated_calls_are_independent() {
    let bars = vec![
        bar(0, 100.0, 101.0, 99.0, 100.0).with_signals(true, false),
        bar(1, 100.0, 103.0, 99.0, 102.0).with_signals(false, true),
        bar(2, 102.0, 103.0, 101.0, 101.0),
    ];
    let a = simulate(&bars, &params()).unwrap();
    let b = simulate(&bars, &params()).unwrap();
    assert_eq!(a, b);
}
