//! Signal detector: entry conditions on a closed coarse bar.
//!
//! Long  iff fast > slow, RSI > long threshold, close > trend.
//!       Trigger = the coarse bar's high.
//! Short iff fast < slow, RSI < short threshold, close < trend.
//!       Trigger = lowest low of the fine bars in
//!       [detection - lookback, detection - 1 minute].
//!
//! The caller only evaluates a bar while the symbol is flat.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Direction, TradeIntent};
use crate::indicators::IndicatorRow;

/// Entry thresholds and the short-trigger lookback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRules {
    pub rsi_long_threshold: f64,
    pub rsi_short_threshold: f64,
    pub short_lookback_minutes: u32,
}

impl Default for SignalRules {
    fn default() -> Self {
        Self {
            rsi_long_threshold: 60.0,
            rsi_short_threshold: 30.0,
            short_lookback_minutes: 5,
        }
    }
}

impl SignalRules {
    pub fn short_lookback(&self) -> Duration {
        Duration::minutes(i64::from(self.short_lookback_minutes))
    }
}

/// Why a bar produced no intent even though it was evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppressed {
    /// Trend reference not yet available.
    Warmup,
    /// Short conditions held but no fine bars sat in the lookback window.
    EmptyLookback,
}

/// Result of evaluating one coarse bar.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    NoSignal,
    Suppressed(Suppressed),
    Intent(TradeIntent),
}

impl Detection {
    pub fn into_intent(self) -> Option<TradeIntent> {
        match self {
            Detection::Intent(intent) => Some(intent),
            _ => None,
        }
    }
}

/// Direction implied by the entry conditions, if any.
///
/// Returns `None` when the trend reference is unavailable. Any NaN input
/// fails every comparison and so yields `None`.
pub fn entry_direction(close: f64, row: &IndicatorRow, rules: &SignalRules) -> Option<Direction> {
    let trend = row.trend?;
    let long = row.fast > row.slow && row.rsi > rules.rsi_long_threshold && close > trend;
    let short = row.fast < row.slow && row.rsi < rules.rsi_short_threshold && close < trend;
    match (long, short) {
        (true, false) => Some(Direction::Long),
        (false, true) => Some(Direction::Short),
        // fast > slow and fast < slow cannot both hold
        _ => None,
    }
}

/// Evaluate a coarse bar and its indicator row.
///
/// `fine` is the symbol's full fine-bar series for the session, time-ordered.
pub fn detect(
    symbol: &str,
    coarse: &Bar,
    row: &IndicatorRow,
    fine: &[Bar],
    rules: &SignalRules,
) -> Detection {
    if row.trend.is_none() {
        return Detection::Suppressed(Suppressed::Warmup);
    }

    let Some(direction) = entry_direction(coarse.close, row, rules) else {
        return Detection::NoSignal;
    };

    let trigger_price = match direction {
        Direction::Long => coarse.high,
        Direction::Short => {
            let to = coarse.timestamp - Duration::minutes(1);
            let from = coarse.timestamp - rules.short_lookback();
            let start = fine.partition_point(|b| b.timestamp < from);
            let end = fine.partition_point(|b| b.timestamp <= to);
            let lowest = fine[start..end.max(start)]
                .iter()
                .map(|b| b.low)
                .reduce(f64::min);
            match lowest {
                Some(low) => low,
                None => return Detection::Suppressed(Suppressed::EmptyLookback),
            }
        }
    };

    Detection::Intent(TradeIntent {
        symbol: symbol.to_string(),
        direction,
        detected_at: coarse.timestamp,
        trigger_price,
    })
}
