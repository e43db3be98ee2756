//! Engine parameters for one backtest.

use chrono::Duration;

use super::ledger::SizingRules;
use super::position::BracketParams;
use super::signal::SignalRules;
use crate::indicators::IndicatorParams;

/// Everything the per-symbol engine and the ledger need.
///
/// Defaults are the reference strategy: 10-minute coarse bars, EMA 3/10,
/// RSI 14 with 60/30 thresholds, hourly EMA 50 trend, 0.5% stop, 2% target,
/// trailing 0.75% once 0.5% in profit, 10-minute fill window.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub coarse_minutes: u32,
    pub indicators: IndicatorParams,
    pub signal: SignalRules,
    pub fill_window_minutes: u32,
    pub bracket: BracketParams,
    pub sizing: SizingRules,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            coarse_minutes: 10,
            indicators: IndicatorParams::default(),
            signal: SignalRules::default(),
            fill_window_minutes: 10,
            bracket: BracketParams::default(),
            sizing: SizingRules::default(),
        }
    }
}

impl EngineConfig {
    pub fn coarse_width(&self) -> Duration {
        Duration::minutes(i64::from(self.coarse_minutes))
    }

    pub fn fill_window(&self) -> Duration {
        Duration::minutes(i64::from(self.fill_window_minutes))
    }
}
