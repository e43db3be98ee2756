//! Trade records: the engine's unsized round trip and the ledger's sized trade.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Direction;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TrailingSL,
    Target,
    EndOfDaySquareOff,
}

impl ExitReason {
    pub const ALL: [ExitReason; 4] = [
        ExitReason::StopLoss,
        ExitReason::TrailingSL,
        ExitReason::Target,
        ExitReason::EndOfDaySquareOff,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::StopLoss => "StopLoss",
            ExitReason::TrailingSL => "TrailingSL",
            ExitReason::Target => "Target",
            ExitReason::EndOfDaySquareOff => "EndOfDaySquareOff",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed round trip before position sizing.
///
/// Everything about the trade that does not depend on capital: the ledger
/// turns it into a [`ClosedTrade`] once the day's capital path is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeFill {
    // ── Identification ──
    pub symbol: String,
    pub direction: Direction,
    pub detected_at: NaiveDateTime,

    // ── Entry ──
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
}

impl TradeFill {
    /// Directional price difference per share, in exact decimal.
    ///
    /// None when either price is not finite or out of decimal range.
    pub fn pnl_per_share(&self) -> Option<Decimal> {
        let entry = Decimal::from_f64(self.entry_price)?;
        let exit = Decimal::from_f64(self.exit_price)?;
        Some(self.direction.per_share_pnl(entry, exit))
    }
}

/// A sized, settled trade: the unit handed to reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    // ── Identification ──
    pub symbol: String,
    pub direction: Direction,
    pub detected_at: NaiveDateTime,

    // ── Entry ──
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Size ──
    pub quantity: u64,

    // ── PnL ──
    pub pnl: Decimal,
    /// P&L as a fraction of capital immediately before this trade settled.
    pub return_pct: f64,
}

impl ClosedTrade {
    /// Attach a size and its realized P&L to a fill.
    pub fn from_fill(fill: TradeFill, quantity: u64, pnl: Decimal, capital_before: Decimal) -> Self {
        let return_pct = pnl
            .checked_div(capital_before)
            .and_then(|r| r.to_f64())
            .unwrap_or(0.0);
        Self {
            symbol: fill.symbol,
            direction: fill.direction,
            detected_at: fill.detected_at,
            entry_time: fill.entry_time,
            entry_price: fill.entry_price,
            exit_time: fill.exit_time,
            exit_price: fill.exit_price,
            exit_reason: fill.exit_reason,
            quantity,
            pnl,
            return_pct,
        }
    }

    /// Session date of the trade.
    pub fn date(&self) -> NaiveDate {
        self.entry_time.date()
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > Decimal::ZERO
    }
}
