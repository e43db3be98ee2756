//! Backtest runner: wires together sessions, universe, engine and ledger.
//!
//! Three layers:
//! - `simulate_day()`: one session. Universe selection, parallel per-symbol
//!   runs, then the ledger sizes the day's fills against the opening capital.
//! - `fold_sessions()`: days in date order, threading capital. A failed day
//!   is recorded and skipped with capital unchanged.
//! - `run_backtest()`: validates config, optionally pins a rayon pool,
//!   folds, and computes metrics. Used by the CLI.

use chrono::NaiveDate;
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use intralab_core::data::{Session, SessionError};
use intralab_core::domain::ClosedTrade;
use intralab_core::engine::{
    settle_day, simulate_symbol, CapitalState, EngineConfig, LedgerError, SignalStats, SymbolRun,
};
use intralab_core::universe::{select_universe, Eligible, UniverseRules};

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::LoadedData;
use crate::metrics::PerformanceMetrics;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Why a single day could not be simulated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DayError {
    #[error("invalid session: {0}")]
    Session(#[from] SessionError),
    #[error("sizing failed: {0}")]
    Ledger(#[from] LedgerError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

// ── Day ──────────────────────────────────────────────────────────────

/// A simulated day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayOutcome {
    pub date: NaiveDate,
    pub start: CapitalState,
    pub end: CapitalState,
    pub eligible: Vec<Eligible>,
    /// Sized trades in entry-time order.
    pub trades: Vec<ClosedTrade>,
    pub stats: SignalStats,
}

impl DayOutcome {
    pub fn pnl(&self) -> Decimal {
        self.trades.iter().map(|t| t.pnl).sum()
    }

    pub fn summary(&self) -> DaySummary {
        DaySummary {
            date: self.date,
            start_capital: self.start.value(),
            end_capital: self.end.value(),
            pnl: self.pnl(),
            trade_count: self.trades.len(),
            eligible: self.eligible.iter().map(|e| e.symbol.clone()).collect(),
            stats: self.stats,
        }
    }
}

/// Per-day line in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub start_capital: Decimal,
    pub end_capital: Decimal,
    pub pnl: Decimal,
    pub trade_count: usize,
    pub eligible: Vec<String>,
    pub stats: SignalStats,
}

/// A day that was skipped. Capital passed through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayFailure {
    pub date: NaiveDate,
    pub capital: Decimal,
    pub reason: String,
}

/// Simulate one session starting from `capital`.
///
/// Eligible symbols run in parallel with no shared state; results are
/// joined in symbol order before the ledger sees any of them.
pub fn simulate_day(
    session: &Session,
    capital: CapitalState,
    engine: &EngineConfig,
    universe: &UniverseRules,
) -> Result<DayOutcome, DayError> {
    session.validate()?;

    let eligible = select_universe(session, universe);
    debug!(
        date = %session.date,
        symbols = session.symbol_count(),
        eligible = eligible.len(),
        "universe selected"
    );

    let mut runs: Vec<SymbolRun> = eligible
        .par_iter()
        .filter_map(|e| {
            session
                .series(&e.symbol)
                .map(|bars| simulate_symbol(&e.symbol, bars, engine))
        })
        .collect();
    runs.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    let mut stats = SignalStats::default();
    let mut fills = Vec::new();
    for run in runs {
        stats.merge(&run.stats);
        fills.extend(run.trades);
    }

    let settlement = settle_day(capital, fills, &engine.sizing)?;

    Ok(DayOutcome {
        date: session.date,
        start: settlement.start,
        end: settlement.end,
        eligible,
        trades: settlement.trades,
        stats,
    })
}

// ── Fold ─────────────────────────────────────────────────────────────

/// Every day of a backtest, before metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionFold {
    pub days: Vec<DayOutcome>,
    pub failures: Vec<DayFailure>,
    pub final_capital: CapitalState,
}

impl SessionFold {
    /// All sized trades, days in date order.
    pub fn trades(&self) -> Vec<ClosedTrade> {
        self.days.iter().flat_map(|d| d.trades.iter().cloned()).collect()
    }

    pub fn stats(&self) -> SignalStats {
        let mut stats = SignalStats::default();
        for day in &self.days {
            stats.merge(&day.stats);
        }
        stats
    }
}

/// Fold `simulate_day` over sessions in date order.
pub fn fold_sessions(
    sessions: &[Session],
    initial: CapitalState,
    engine: &EngineConfig,
    universe: &UniverseRules,
) -> SessionFold {
    let mut ordered: Vec<&Session> = sessions.iter().collect();
    ordered.sort_by_key(|s| s.date);

    let mut capital = initial;
    let mut days = Vec::with_capacity(ordered.len());
    let mut failures = Vec::new();

    for session in ordered {
        info!(date = %session.date, capital = %capital.value(), "day start");
        match simulate_day(session, capital, engine, universe) {
            Ok(day) => {
                info!(
                    date = %day.date,
                    trades = day.trades.len(),
                    pnl = %day.pnl(),
                    capital = %day.end.value(),
                    "day finished"
                );
                capital = day.end;
                days.push(day);
            }
            Err(err) => {
                warn!(date = %session.date, error = %err, "day skipped");
                failures.push(DayFailure {
                    date: session.date,
                    capital: capital.value(),
                    reason: err.to_string(),
                });
            }
        }
    }

    SessionFold {
        days,
        failures,
        final_capital: capital,
    }
}

// ── Backtest ─────────────────────────────────────────────────────────

/// Complete result of a backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config: BacktestConfig,
    pub config_hash: String,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub initial_capital: Decimal,
    pub final_capital: Decimal,
    pub metrics: PerformanceMetrics,
    pub stats: SignalStats,
    pub days: Vec<DaySummary>,
    pub failures: Vec<DayFailure>,
    pub trades: Vec<ClosedTrade>,
}

/// Run a backtest over pre-loaded sessions.
pub fn run_backtest(loaded: &LoadedData, config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let config_hash = config.config_hash()?;
    let engine = config.to_engine_config();
    let universe = config.universe_rules();
    let initial = CapitalState::new(config.initial_capital()?);

    let run = || fold_sessions(&loaded.sessions, initial, &engine, &universe);
    let fold = match config.backtest.threads {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?
            .install(run),
        None => run(),
    };

    let trades = fold.trades();
    let metrics = PerformanceMetrics::compute(&trades, initial.as_f64(), fold.final_capital.as_f64());

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        config: config.clone(),
        config_hash,
        dataset_hash: loaded.dataset_hash.clone(),
        has_synthetic: loaded.has_synthetic,
        start_date: loaded.sessions.iter().map(|s| s.date).min(),
        end_date: loaded.sessions.iter().map(|s| s.date).max(),
        initial_capital: initial.value(),
        final_capital: fold.final_capital.value(),
        metrics,
        stats: fold.stats(),
        days: fold.days.iter().map(DayOutcome::summary).collect(),
        failures: fold.failures,
        trades,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use intralab_core::data::{synthetic_sessions, SyntheticParams};
    use intralab_core::domain::Bar;
    use rust_decimal_macros::dec;

    fn sessions(days: usize) -> Vec<Session> {
        synthetic_sessions(&SyntheticParams {
            days,
            seed: 7,
            ..SyntheticParams::default()
        })
    }

    #[test]
    fn day_outcome_threads_capital() {
        let session = &sessions(1)[0];
        let engine = EngineConfig::default();
        let day = simulate_day(
            session,
            CapitalState::new(dec!(500_000)),
            &engine,
            &UniverseRules::default(),
        )
        .unwrap();
        assert_eq!(day.date, session.date);
        assert_eq!(day.start.value(), dec!(500_000));
        assert_eq!(day.end.value() - day.start.value(), day.pnl());
        assert_eq!(day.eligible.len(), 10);
    }

    #[test]
    fn invalid_session_fails_only_that_day() {
        let mut sessions = sessions(3);
        let bars = sessions[1].bars.values_mut().next().unwrap();
        let dup: Bar = bars[5];
        bars.insert(5, dup);

        let fold = fold_sessions(
            &sessions,
            CapitalState::new(dec!(1_000_000)),
            &EngineConfig::default(),
            &UniverseRules::default(),
        );
        assert_eq!(fold.days.len(), 2);
        assert_eq!(fold.failures.len(), 1);
        assert_eq!(fold.failures[0].date, sessions[1].date);
        assert_eq!(fold.failures[0].capital, fold.days[0].end.value());
        assert_eq!(fold.days[1].start, fold.days[0].end);
    }

    #[test]
    fn fold_orders_sessions_by_date() {
        let mut sessions = sessions(3);
        sessions.reverse();
        let fold = fold_sessions(
            &sessions,
            CapitalState::new(dec!(1_000_000)),
            &EngineConfig::default(),
            &UniverseRules::default(),
        );
        let dates: Vec<_> = fold.days.iter().map(|d| d.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
    }

    #[test]
    fn summary_matches_outcome() {
        let session = &sessions(1)[0];
        let day = simulate_day(
            session,
            CapitalState::new(dec!(1_000_000)),
            &EngineConfig::default(),
            &UniverseRules::default(),
        )
        .unwrap();
        let summary = day.summary();
        assert_eq!(summary.trade_count, day.trades.len());
        assert_eq!(summary.eligible.len(), day.eligible.len());
        assert_eq!(summary.end_capital, day.end.value());
    }

    #[test]
    fn day_error_messages_name_the_cause() {
        let err = DayError::from(SessionError::Empty {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        });
        assert!(err.to_string().contains("2024-01-02"));
    }
}
