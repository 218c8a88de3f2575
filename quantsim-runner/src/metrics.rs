//! Performance metrics — pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity curve and/or trade list in, scalar out.
//! Degenerate inputs produce NaN ("undefined"), never an error.

use quantsim_core::domain::TradeRecord;
use quantsim_core::engine::{EquityPoint, SimulationResult};
use serde::{Deserialize, Serialize};

/// Seconds in a 365.25-day year.
pub const SECONDS_PER_YEAR: f64 = 365.25 * 86_400.0;

/// Hourly bars per year (24 · 365.25).
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 24.0 * 365.25;

/// Aggregate performance metrics for a single backtest run.
///
/// Serialized with fixed keys; undefined values become JSON `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    #[serde(with = "nan_as_null")]
    pub final_equity: f64,
    #[serde(rename = "CAGR", with = "nan_as_null")]
    pub cagr: f64,
    #[serde(rename = "MaxDD", with = "nan_as_null")]
    pub max_drawdown: f64,
    #[serde(rename = "Sharpe", with = "nan_as_null")]
    pub sharpe: f64,
    #[serde(rename = "Sortino", with = "nan_as_null")]
    pub sortino: f64,
    #[serde(rename = "Calmar", with = "nan_as_null")]
    pub calmar: f64,
    #[serde(rename = "WinRate", with = "nan_as_null")]
    pub win_rate: f64,
    #[serde(rename = "Trades")]
    pub trades: usize,
}

impl PerformanceMetrics {
    /// Compute all metrics from an equity curve and trade list.
    pub fn compute(equity: &[EquityPoint], trades: &[TradeRecord], periods_per_year: f64) -> Self {
        let values: Vec<f64> = equity.iter().map(|p| p.equity).collect();
        let cagr = cagr(equity);
        let max_drawdown = max_drawdown(&values);
        Self {
            final_equity: values.last().copied().unwrap_or(f64::NAN),
            cagr,
            max_drawdown,
            sharpe: sharpe_ratio(&values, periods_per_year),
            sortino: sortino_ratio(&values, periods_per_year),
            calmar: calmar_ratio(cagr, max_drawdown),
            win_rate: win_rate(trades),
            trades: trades.len(),
        }
    }

    pub fn from_result(result: &SimulationResult, periods_per_year: f64) -> Self {
        Self::compute(&result.equity, &result.trades, periods_per_year)
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Compound Annual Growth Rate over the wall-clock span of the curve.
///
/// NaN with fewer than two points, a non-positive span, or a non-positive
/// starting equity.
pub fn cagr(equity: &[EquityPoint]) -> f64 {
    let (Some(first), Some(last)) = (equity.first(), equity.last()) else {
        return f64::NAN;
    };
    if equity.len() < 2 {
        return f64::NAN;
    }
    let elapsed = (last.timestamp - first.timestamp).num_milliseconds() as f64 / 1000.0;
    let years = elapsed / SECONDS_PER_YEAR;
    if years <= 0.0 || first.equity <= 0.0 {
        return f64::NAN;
    }
    (last.equity / first.equity).powf(1.0 / years) - 1.0
}

/// Maximum drawdown as a non-positive fraction (e.g. -0.15 = 15% drawdown).
///
/// 0.0 if equity never falls below its running peak; NaN for an empty curve.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    if equity_curve.is_empty() {
        return f64::NAN;
    }
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        peak = peak.max(eq);
        let dd = eq / peak - 1.0;
        if dd < max_dd {
            max_dd = dd;
        }
    }
    max_dd
}

/// Annualized Sharpe ratio: mean / sample std of period returns · √ppy.
pub fn sharpe_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let returns = period_returns(equity_curve);
    let std = std_dev(&returns);
    if returns.is_empty() || std.is_nan() || std == 0.0 {
        return f64::NAN;
    }
    mean_f64(&returns) / std * periods_per_year.sqrt()
}

/// Annualized Sortino ratio: the denominator is the sample std of the
/// negative returns only.
pub fn sortino_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let returns = period_returns(equity_curve);
    if returns.is_empty() {
        return f64::NAN;
    }
    let downside: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
    if downside.len() < 2 {
        return f64::NAN;
    }
    let downside_std = std_dev(&downside);
    if downside_std == 0.0 || downside_std.is_nan() {
        return f64::NAN;
    }
    mean_f64(&returns) / downside_std * periods_per_year.sqrt()
}

/// Calmar ratio: CAGR / |max drawdown|.
pub fn calmar_ratio(cagr: f64, max_drawdown: f64) -> f64 {
    if cagr.is_nan() || max_drawdown.is_nan() || max_drawdown == 0.0 {
        return f64::NAN;
    }
    cagr / max_drawdown.abs()
}

/// Win rate: fraction of trades with positive net PnL.
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return f64::NAN;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

/// Drawdown series: equity / running max − 1 at every point.
pub fn drawdown_series(equity_curve: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    equity_curve
        .iter()
        .map(|&eq| {
            peak = peak.max(eq);
            eq / peak - 1.0
        })
        .collect()
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple returns e_t / e_{t-1} − 1.
pub fn period_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (ddof = 1); NaN below two values.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Non-finite floats serialize as `null`; `null` reads back as NaN.
pub(crate) mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}
