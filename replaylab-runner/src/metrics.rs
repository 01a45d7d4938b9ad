//! Performance statistics: pure functions over the trade log and equity series.
//!
//! Per-trade statistics are weighted by each trade's entry allocation,
//! normalized to sum to one. Win rate and best/worst trade are unweighted.
//! Sharpe is annualized with a fixed 252 regardless of bar resolution.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::warn;

use replaylab_core::domain::Trade;
use replaylab_core::engine::RunResult;

/// Annualization constant applied to the per-trade Sharpe ratio.
pub const ANNUALIZATION: f64 = 252.0;

/// Aggregate statistics for one run.
///
/// `profit_factor` and `calmar_ratio` may be `+inf` (no losses, no drawdown).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub total_return: f64,
    pub num_trades: usize,
    pub win_rate: f64,
    pub avg_return: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub sharpe_ratio: f64,
    pub profit_factor: f64,
    pub max_drawdown: f64,
    pub calmar_ratio: f64,
}

impl PerformanceStats {
    /// Compute statistics, or `None` when no trade closed.
    pub fn compute(trades: &[Trade], equity: &[f64], initial_cash: f64) -> Option<Self> {
        if trades.is_empty() {
            warn!("no trades executed");
            return None;
        }

        let returns: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();
        let weights = normalized_weights(&trades.iter().map(|t| t.weight).collect::<Vec<_>>());

        let avg_return = weighted_mean(&returns, &weights);
        let std = weighted_std(&returns, &weights, avg_return);
        let final_equity = equity.last().copied().unwrap_or(initial_cash);
        let total_return = total_return(final_equity, initial_cash);
        let max_drawdown = max_drawdown(equity);

        Some(Self {
            total_return,
            num_trades: trades.len(),
            win_rate: win_rate(trades),
            avg_return,
            avg_win: subset_weighted_mean(trades, Trade::is_winner),
            avg_loss: subset_weighted_mean(trades, Trade::is_loser),
            best_trade: returns.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            worst_trade: returns.iter().copied().fold(f64::INFINITY, f64::min),
            sharpe_ratio: sharpe_ratio(avg_return, std),
            profit_factor: profit_factor(trades),
            max_drawdown,
            calmar_ratio: calmar_ratio(total_return, max_drawdown),
        })
    }

    pub fn from_run(result: &RunResult) -> Option<Self> {
        Self::compute(&result.trades, &result.equity_values(), result.initial_cash)
    }

    /// Human-readable table of every statistic.
    pub fn summary_table(&self) -> String {
        let rows: [(&str, String); 12] = [
            ("Total Return", pct(self.total_return)),
            ("Trades", self.num_trades.to_string()),
            ("Win Rate", pct(self.win_rate)),
            ("Avg Return", pct(self.avg_return)),
            ("Avg Win", pct(self.avg_win)),
            ("Avg Loss", pct(self.avg_loss)),
            ("Best Trade", pct(self.best_trade)),
            ("Worst Trade", pct(self.worst_trade)),
            ("Sharpe Ratio", ratio(self.sharpe_ratio)),
            ("Profit Factor", ratio(self.profit_factor)),
            ("Max Drawdown", pct(self.max_drawdown)),
            ("Calmar Ratio", ratio(self.calmar_ratio)),
        ];
        let mut out = String::new();
        let _ = writeln!(out, "{:=<34}", "");
        let _ = writeln!(out, " PERFORMANCE");
        let _ = writeln!(out, "{:=<34}", "");
        for (label, value) in rows {
            let _ = writeln!(out, " {label:<18}{value:>14}");
        }
        let _ = write!(out, "{:=<34}", "");
        out
    }
}

fn pct(v: f64) -> String {
    format!("{:.2}%", v * 100.0)
}

fn ratio(v: f64) -> String {
    if v.is_infinite() {
        "inf".to_string()
    } else {
        format!("{v:.2}")
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Scale weights to sum to one; uniform `1/n` when they sum to zero.
pub fn normalized_weights(weights: &[f64]) -> Vec<f64> {
    if weights.is_empty() {
        return Vec::new();
    }
    let sum: f64 = weights.iter().sum();
    if sum == 0.0 || !sum.is_finite() {
        let uniform = 1.0 / weights.len() as f64;
        return vec![uniform; weights.len()];
    }
    weights.iter().map(|w| w / sum).collect()
}

/// Σ wᵢ·xᵢ for weights already normalized.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    values.iter().zip(weights).map(|(x, w)| x * w).sum()
}

/// sqrt(Σ wᵢ·(xᵢ − mean)²), or 0 when the variance is not positive.
pub fn weighted_std(values: &[f64], weights: &[f64], mean: f64) -> f64 {
    let variance: f64 = values
        .iter()
        .zip(weights)
        .map(|(x, w)| w * (x - mean).powi(2))
        .sum();
    if variance > 0.0 {
        variance.sqrt()
    } else {
        0.0
    }
}

/// mean / std × sqrt(252), or 0 when std is not positive.
pub fn sharpe_ratio(mean: f64, std: f64) -> f64 {
    if std > 0.0 {
        mean / std * ANNUALIZATION.sqrt()
    } else {
        0.0
    }
}

/// Weighted mean return of the trades matching `keep`, with weights
/// renormalized inside the subset. 0 for an empty subset.
pub fn subset_weighted_mean(trades: &[Trade], keep: impl Fn(&Trade) -> bool) -> f64 {
    let subset: Vec<&Trade> = trades.iter().filter(|t| keep(t)).collect();
    if subset.is_empty() {
        return 0.0;
    }
    let returns: Vec<f64> = subset.iter().map(|t| t.return_pct).collect();
    let weights = normalized_weights(&subset.iter().map(|t| t.weight).collect::<Vec<_>>());
    weighted_mean(&returns, &weights)
}

/// Fraction of trades with a positive return, unweighted.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// |Σ winning P&L| / |Σ losing P&L|; `+inf` with no losing P&L.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_win: f64 = trades.iter().filter(|t| t.is_winner()).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades.iter().filter(|t| t.is_loser()).map(|t| t.pnl).sum();
    if gross_loss == 0.0 {
        return f64::INFINITY;
    }
    (gross_win / gross_loss).abs()
}

/// Most negative `(equity − running max) / running max`; 0 for a series that
/// never dips. Samples before the running max turns positive are skipped.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &eq in equity {
        peak = peak.max(eq);
        if peak > 0.0 {
            worst = worst.min((eq - peak) / peak);
        }
    }
    worst
}

/// total_return / |max_drawdown|, or `+inf` when drawdown is exactly 0.
pub fn calmar_ratio(total_return: f64, max_drawdown: f64) -> f64 {
    if max_drawdown == 0.0 {
        f64::INFINITY
    } else {
        total_return / max_drawdown.abs()
    }
}

pub fn total_return(final_equity: f64, initial_cash: f64) -> f64 {
    (final_equity - initial_cash) / initial_cash
}
