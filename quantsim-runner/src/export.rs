//! Reporting and export — JSON, CSV, and Markdown artifact generation.
//!
//! Artifacts written by the optimize pipeline:
//! - **JSON**: best parameters, best training score, per-split metrics
//! - **CSV**: trial table, equity, drawdown, trade tape, period returns
//! - **Markdown**: a human-readable summary of the evaluated splits

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use quantsim_core::domain::TradeRecord;
use quantsim_core::engine::EquityPoint;

use crate::metrics::drawdown_series;
use crate::returns::{returns_table, Period};
use crate::runner::BacktestResult;
use crate::sweep::{SearchResult, Trial};
use crate::walk_forward::TrialOutcome;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize any artifact to pretty JSON.
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize artifact to JSON")
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = to_pretty_json(value)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

#[derive(Serialize)]
struct BestValue {
    best_calmar_train: f64,
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Equity curve with timestamp and equity columns.
pub fn export_equity_csv(equity: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "equity"])?;
    for p in equity {
        wtr.write_record([p.timestamp.to_rfc3339(), format!("{:.6}", p.equity)])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Drawdown from running peak at every equity point.
pub fn export_drawdown_csv(equity: &[EquityPoint]) -> Result<String> {
    let values: Vec<f64> = equity.iter().map(|p| p.equity).collect();
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "drawdown"])?;
    for (p, dd) in equity.iter().zip(drawdown_series(&values)) {
        wtr.write_record([p.timestamp.to_rfc3339(), format!("{dd:.8}")])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Trade tape, one row per round trip.
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "side",
        "entry_bar",
        "entry_time",
        "entry_price",
        "exit_bar",
        "exit_time",
        "exit_price",
        "exit_reason",
        "bars_held",
        "quantity",
        "gross_pnl",
        "fees",
        "pnl",
        "return_pct",
    ])?;
    for t in trades {
        wtr.write_record([
            format!("{:?}", t.side),
            t.entry_bar.to_string(),
            t.entry_time.to_rfc3339(),
            format!("{:.6}", t.entry_price),
            t.exit_bar.to_string(),
            t.exit_time.to_rfc3339(),
            format!("{:.6}", t.exit_price),
            format!("{:?}", t.exit_reason),
            t.bars_held().to_string(),
            format!("{:.6}", t.quantity),
            format!("{:.6}", t.gross_pnl),
            format!("{:.6}", t.fees),
            format!("{:.6}", t.pnl),
            format!("{:.6}", t.return_pct() * 100.0),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Period return table (`period_end, return, return_pct`).
pub fn export_returns_csv(equity: &[EquityPoint], period: Period) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let rows = returns_table(equity, period);
    if rows.is_empty() {
        wtr.write_record(["period_end", "return", "return_pct"])?;
    }
    for row in rows {
        wtr.serialize(row)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per trial: number, state, score, duration, parameters, prune reason.
pub fn export_trials_csv(trials: &[Trial]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "number",
        "state",
        "value",
        "duration_ms",
        "rsi_window",
        "rsi_low",
        "rsi_high",
        "sma_fast",
        "sma_slow",
        "macd_fast",
        "macd_slow",
        "macd_signal",
        "sl",
        "tp",
        "n_shares",
        "prune_reason",
    ])?;
    for t in trials {
        let (state, value, reason) = match &t.outcome {
            TrialOutcome::Completed { score, .. } => ("COMPLETE", score.to_string(), String::new()),
            TrialOutcome::Pruned(reason) => ("PRUNED", String::new(), reason.to_string()),
        };
        let s = &t.params.signal;
        wtr.write_record([
            t.number.to_string(),
            state.to_string(),
            value,
            t.duration_ms.to_string(),
            s.rsi_window.to_string(),
            s.rsi_low.to_string(),
            s.rsi_high.to_string(),
            s.sma_fast.to_string(),
            s.sma_slow.to_string(),
            s.macd_fast.to_string(),
            s.macd_slow.to_string(),
            s.macd_signal.to_string(),
            t.params.stop_loss.to_string(),
            t.params.take_profit.to_string(),
            t.params.n_shares.to_string(),
            reason,
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `best_params.json`, `best_value.json` and `trials.csv`.
///
/// The best-trial files are skipped when every trial was pruned.
pub fn save_search_artifacts(search: &SearchResult, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    if let (Some(params), Some(value)) = (search.best_params(), search.best_value()) {
        write_json(&output_dir.join("best_params.json"), &params)?;
        write_json(
            &output_dir.join("best_value.json"),
            &BestValue {
                best_calmar_train: value,
            },
        )?;
    }
    write_text(&output_dir.join("trials.csv"), &export_trials_csv(&search.trials)?)?;
    Ok(())
}

/// Write every per-split artifact for one evaluated split (`test`,
/// `validation`, ...).
pub fn save_split_artifacts(label: &str, result: &BacktestResult, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    write_json(&output_dir.join(format!("metrics_{label}.json")), &result.metrics)?;
    write_text(
        &output_dir.join(format!("equity_{label}.csv")),
        &export_equity_csv(&result.equity)?,
    )?;
    write_text(
        &output_dir.join(format!("drawdown_{label}.csv")),
        &export_drawdown_csv(&result.equity)?,
    )?;
    write_text(
        &output_dir.join(format!("trades_{label}.csv")),
        &export_trades_csv(&result.trades)?,
    )?;
    for period in Period::ALL {
        write_text(
            &output_dir.join(format!("returns_{label}_{}.csv", period.as_str())),
            &export_returns_csv(&result.equity, period)?,
        )?;
    }
    Ok(())
}

// ─── Markdown reports ───────────────────────────────────────────────

fn fmt_metric(value: f64, scale: f64, decimals: usize, suffix: &str) -> String {
    if value.is_finite() {
        format!("{:.*}{suffix}", decimals, value * scale)
    } else {
        "n/a".to_string()
    }
}

/// Markdown summary of the evaluated splits.
pub fn generate_report(search: &SearchResult, splits: &[(&str, &BacktestResult)]) -> String {
    let mut md = String::with_capacity(2048);
    md.push_str("# Optimization Report\n\n");

    md.push_str("## Search\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Trials | {} |\n", search.trials.len()));
    md.push_str(&format!("| Completed | {} |\n", search.completed()));
    md.push_str(&format!("| Pruned | {} |\n", search.pruned()));
    match search.best_trial() {
        Some(best) => {
            md.push_str(&format!("| Best Trial | {} |\n", best.number));
            md.push_str(&format!(
                "| Best Calmar (train) | {} |\n",
                fmt_metric(best.outcome.score().unwrap_or(f64::NAN), 1.0, 4, "")
            ));
        }
        None => md.push_str("| Best Trial | none |\n"),
    }
    md.push('\n');

    for (label, result) in splits {
        let m = &result.metrics;
        md.push_str(&format!("## {label}\n\n"));
        md.push_str("| Metric | Value |\n");
        md.push_str("| --- | --- |\n");
        md.push_str(&format!("| Final Equity | {:.2} |\n", m.final_equity));
        md.push_str(&format!("| CAGR | {} |\n", fmt_metric(m.cagr, 100.0, 2, "%")));
        md.push_str(&format!("| Max Drawdown | {} |\n", fmt_metric(m.max_drawdown, 100.0, 2, "%")));
        md.push_str(&format!("| Sharpe | {} |\n", fmt_metric(m.sharpe, 1.0, 3, "")));
        md.push_str(&format!("| Sortino | {} |\n", fmt_metric(m.sortino, 1.0, 3, "")));
        md.push_str(&format!("| Calmar | {} |\n", fmt_metric(m.calmar, 1.0, 3, "")));
        md.push_str(&format!("| Win Rate | {} |\n", fmt_metric(m.win_rate, 100.0, 1, "%")));
        md.push_str(&format!("| Trades | {} |\n", m.trades));
        md.push_str(&format!(
            "| Signals | {} buy / {} sell |\n",
            result.buy_signals, result.sell_signals
        ));
        md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
        md.push('\n');
    }
    md
}
