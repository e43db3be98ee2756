//! Performance metrics: pure functions over the settled trade list.
//!
//! Returns are per trade (P&L over capital before the trade), so the
//! portfolio equity curve is the cumulative product of `1 + return`,
//! starting at 1.0 before the first trade.

use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use intralab_core::domain::{ClosedTrade, Direction, ExitReason};

/// Trading days per year used to annualize the Sharpe ratio.
pub const PERIODS_PER_YEAR: f64 = 252.0;

/// Aggregate performance metrics for a backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub trade_count: usize,
    pub total_return: f64,
    pub win_rate: f64,
    pub max_drawdown: f64,
    pub sharpe: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub profit_factor: f64,
    pub long_count: usize,
    pub short_count: usize,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    /// Trade count per exit reason. Every reason is present, possibly zero.
    pub exit_reasons: BTreeMap<String, usize>,
    pub initial_capital: f64,
    pub final_capital: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics from trades in settlement order.
    pub fn compute(trades: &[ClosedTrade], initial_capital: f64, final_capital: f64) -> Self {
        let returns: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();
        let curve = equity_curve(&returns);
        Self {
            trade_count: trades.len(),
            total_return: total_return(&curve),
            win_rate: win_rate(trades),
            max_drawdown: max_drawdown(&curve),
            sharpe: sharpe_ratio(&returns),
            gross_profit: gross_profit(trades),
            gross_loss: gross_loss(trades),
            profit_factor: profit_factor(trades),
            long_count: count_direction(trades, Direction::Long),
            short_count: count_direction(trades, Direction::Short),
            max_consecutive_wins: max_consecutive(trades, true),
            max_consecutive_losses: max_consecutive(trades, false),
            exit_reasons: exit_reason_counts(trades),
            initial_capital,
            final_capital,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Compounded equity curve: `[1.0, (1+r0), (1+r0)(1+r1), ...]`.
pub fn equity_curve(returns: &[f64]) -> Vec<f64> {
    let mut curve = Vec::with_capacity(returns.len() + 1);
    let mut equity = 1.0;
    curve.push(equity);
    for r in returns {
        equity *= 1.0 + r;
        curve.push(equity);
    }
    curve
}

/// Total return as a fraction: last equity − 1.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    equity_curve.last().map_or(0.0, |last| last - 1.0)
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if equity is constant or monotonically increasing.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;

    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = eq / peak - 1.0;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Annualized Sharpe ratio of per-trade returns.
///
/// Sharpe = mean / sample std × √252. Returns 0.0 with fewer than two
/// trades or zero variance.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(returns) / std * PERIODS_PER_YEAR.sqrt()
}

/// Win rate: fraction of trades with P&L > 0.
pub fn win_rate(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64
}

pub fn gross_profit(trades: &[ClosedTrade]) -> f64 {
    let sum: Decimal = trades.iter().filter(|t| t.pnl > Decimal::ZERO).map(|t| t.pnl).sum();
    sum.to_f64().unwrap_or(0.0)
}

/// Sum of losing P&L as a positive number.
pub fn gross_loss(trades: &[ClosedTrade]) -> f64 {
    let sum: Decimal = trades.iter().filter(|t| t.pnl < Decimal::ZERO).map(|t| -t.pnl).sum();
    sum.to_f64().unwrap_or(0.0)
}

/// Profit factor: gross profits / gross losses.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let profit = gross_profit(trades);
    let loss = gross_loss(trades);
    if loss < 1e-10 {
        return if profit > 0.0 { 100.0 } else { 0.0 };
    }
    (profit / loss).min(100.0)
}

pub fn exit_reason_counts(trades: &[ClosedTrade]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = ExitReason::ALL
        .iter()
        .map(|r| (r.as_str().to_string(), 0))
        .collect();
    for trade in trades {
        *counts.entry(trade.exit_reason.as_str().to_string()).or_default() += 1;
    }
    counts
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn count_direction(trades: &[ClosedTrade], direction: Direction) -> usize {
    trades.iter().filter(|t| t.direction == direction).count()
}

fn max_consecutive(trades: &[ClosedTrade], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;

    for trade in trades {
        if trade.is_winner() == winners {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}
