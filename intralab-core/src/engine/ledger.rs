//! Capital ledger: sizes a day's trades against compounding capital.
//!
//! Runs once per session after every symbol has finished. Trades are settled
//! strictly in entry-time order, each sized from the capital left by the
//! previous one. Fills are assumed never to overlap in capital usage.
//!
//! Capital and P&L are decimals, so a day's P&L sums to exactly the change
//! in capital. Prices stay `f64` and are converted once per trade.

use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ClosedTrade, TradeFill};

/// Risk budget per trade and the stop distance it is measured against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingRules {
    pub risk_per_trade: f64,
    pub stop_loss_pct: f64,
}

impl Default for SizingRules {
    fn default() -> Self {
        Self {
            risk_per_trade: 0.005,
            stop_loss_pct: 0.005,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("{symbol} @ {entry_time}: entry price {price} is not positive")]
    NonPositiveEntryPrice {
        symbol: String,
        entry_time: NaiveDateTime,
        price: f64,
    },

    #[error("{symbol} @ {entry_time}: position size {raw} is not a finite number")]
    InvalidSize {
        symbol: String,
        entry_time: NaiveDateTime,
        raw: f64,
    },

    #[error("{symbol} @ {entry_time}: exit price {price} has no decimal value")]
    InvalidExitPrice {
        symbol: String,
        entry_time: NaiveDateTime,
        price: f64,
    },

    #[error("{symbol} @ {entry_time}: P&L overflows the capital ledger")]
    Overflow {
        symbol: String,
        entry_time: NaiveDateTime,
    },
}

/// Current capital. Only the ledger changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapitalState {
    capital: Decimal,
}

impl CapitalState {
    pub fn new(initial: Decimal) -> Self {
        Self { capital: initial }
    }

    pub fn value(&self) -> Decimal {
        self.capital
    }

    /// Capital as a float, for sizing and metrics.
    pub fn as_f64(&self) -> f64 {
        self.capital.to_f64().unwrap_or(0.0)
    }

    fn realize(self, pnl: Decimal) -> Option<Self> {
        self.capital.checked_add(pnl).map(Self::new)
    }
}

/// Result of settling one session.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySettlement {
    pub start: CapitalState,
    pub end: CapitalState,
    /// Sized trades in entry-time order.
    pub trades: Vec<ClosedTrade>,
}

impl DaySettlement {
    pub fn pnl(&self) -> Decimal {
        self.trades.iter().map(|t| t.pnl).sum()
    }
}

/// Shares for one trade: floor(capital × risk ÷ (entry × stop)), at least 1.
pub fn size_quantity(capital: f64, fill: &TradeFill, rules: &SizingRules) -> Result<u64, LedgerError> {
    if !(fill.entry_price > 0.0) {
        return Err(LedgerError::NonPositiveEntryPrice {
            symbol: fill.symbol.clone(),
            entry_time: fill.entry_time,
            price: fill.entry_price,
        });
    }

    let raw = (capital * rules.risk_per_trade / (fill.entry_price * rules.stop_loss_pct)).floor();
    if !raw.is_finite() {
        return Err(LedgerError::InvalidSize {
            symbol: fill.symbol.clone(),
            entry_time: fill.entry_time,
            raw,
        });
    }

    // `as` saturates; a negative raw size clamps to the minimum of one share
    Ok((raw.max(0.0) as u64).max(1))
}

/// Sort a day's fills by entry time and settle them one by one.
///
/// The sort is stable, so fills entered at the same instant keep the order
/// they arrived in. Any sizing error aborts the whole day.
pub fn settle_day(
    capital: CapitalState,
    mut fills: Vec<TradeFill>,
    rules: &SizingRules,
) -> Result<DaySettlement, LedgerError> {
    fills.sort_by(|a, b| a.entry_time.cmp(&b.entry_time));

    let start = capital;
    let mut current = capital;
    let mut trades = Vec::with_capacity(fills.len());

    for fill in fills {
        let quantity = size_quantity(current.as_f64(), &fill, rules)?;
        let per_share = fill
            .pnl_per_share()
            .ok_or_else(|| LedgerError::InvalidExitPrice {
                symbol: fill.symbol.clone(),
                entry_time: fill.entry_time,
                price: fill.exit_price,
            })?;
        let overflow = || LedgerError::Overflow {
            symbol: fill.symbol.clone(),
            entry_time: fill.entry_time,
        };
        let pnl = Decimal::from(quantity)
            .checked_mul(per_share)
            .ok_or_else(overflow)?;
        let after = current.realize(pnl).ok_or_else(overflow)?;

        trades.push(ClosedTrade::from_fill(fill, quantity, pnl, current.value()));
        current = after;
    }

    Ok(DaySettlement {
        start,
        end: current,
        trades,
    })
}
