//! Per-symbol session run.
//!
//! Walks one symbol's coarse bars in time order. A bar is evaluated only
//! while the symbol is flat, i.e. the previous trade exited at or before the
//! bar's timestamp. An intent is resolved by the fill simulator on the spot,
//! and a fill is driven to its exit over the rest of the session before the
//! walk resumes.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::config::EngineConfig;
use super::fill::{simulate_fill, FillOutcome};
use super::position::OpenPosition;
use super::signal::{detect, Detection, Suppressed};
use crate::domain::{Bar, TradeFill};
use crate::indicators::{resample, IndicatorFeed};

/// Counters for one symbol (or, merged, for one day).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalStats {
    pub coarse_bars: usize,
    /// Bars skipped because a position was open.
    pub busy: usize,
    /// Bars without an indicator row or trend reference.
    pub warmup: usize,
    pub empty_lookback: usize,
    pub intents: usize,
    pub expired: usize,
    pub fills: usize,
}

impl SignalStats {
    pub fn merge(&mut self, other: &SignalStats) {
        self.coarse_bars += other.coarse_bars;
        self.busy += other.busy;
        self.warmup += other.warmup;
        self.empty_lookback += other.empty_lookback;
        self.intents += other.intents;
        self.expired += other.expired;
        self.fills += other.fills;
    }
}

/// Everything one symbol produced in one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolRun {
    pub symbol: String,
    /// Unsized trades in entry-time order.
    pub trades: Vec<TradeFill>,
    pub stats: SignalStats,
}

/// Run the engine over one symbol's fine bars for one session.
///
/// `fine` must be time-ordered and belong to a single session.
pub fn simulate_symbol(symbol: &str, fine: &[Bar], config: &EngineConfig) -> SymbolRun {
    let coarse = resample(fine, config.coarse_width());
    let feed = IndicatorFeed::build(symbol, fine, &coarse, &config.indicators);

    let mut stats = SignalStats::default();
    let mut trades = Vec::new();
    let mut flat_from: Option<NaiveDateTime> = None;

    for (i, bar) in coarse.iter().enumerate() {
        stats.coarse_bars += 1;

        if flat_from.is_some_and(|t| bar.timestamp < t) {
            stats.busy += 1;
            continue;
        }

        let Some(row) = feed.row(i) else {
            stats.warmup += 1;
            continue;
        };

        let intent = match detect(symbol, bar, row, fine, &config.signal) {
            Detection::NoSignal => continue,
            Detection::Suppressed(Suppressed::Warmup) => {
                stats.warmup += 1;
                continue;
            }
            Detection::Suppressed(Suppressed::EmptyLookback) => {
                stats.empty_lookback += 1;
                continue;
            }
            Detection::Intent(intent) => intent,
        };
        stats.intents += 1;

        let fill = match simulate_fill(&intent, fine, config.fill_window()) {
            FillOutcome::Filled(fill) => fill,
            FillOutcome::Expired => {
                stats.expired += 1;
                trace!(
                    symbol,
                    detected_at = %intent.detected_at,
                    direction = %intent.direction,
                    trigger = intent.trigger_price,
                    "intent expired"
                );
                continue;
            }
        };
        stats.fills += 1;

        let position = OpenPosition::open(&intent, &fill, &config.bracket);
        let trade = position.run(&fine[fill.bar_index..]);
        flat_from = Some(trade.exit_time);
        trades.push(trade);
    }

    debug!(
        symbol,
        coarse_bars = stats.coarse_bars,
        intents = stats.intents,
        fills = stats.fills,
        expired = stats.expired,
        "symbol session done"
    );

    SymbolRun {
        symbol: symbol.to_string(),
        trades,
        stats,
    }
}
