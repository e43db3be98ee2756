//! IntraLab Runner: backtest orchestration, configuration, reporting.
//!
//! This crate builds on `intralab-core` to provide:
//! - TOML configuration with validation and a stable config hash
//! - Session loading from CSV files, with a synthetic fallback
//! - The day fold: parallel per-symbol runs, ledger, isolated day failures
//! - Performance metrics and the artifact bundle (trade log, manifest, report)

pub mod config;
pub mod data_loader;
pub mod metrics;
pub mod reporting;
pub mod runner;

pub use config::{BacktestConfig, ConfigError};
pub use data_loader::{load_sessions, LoadError, LoadOptions, LoadedData};
pub use metrics::PerformanceMetrics;
pub use reporting::{ArtifactManager, ArtifactPaths, MarkdownReportGenerator};
pub use runner::{
    fold_sessions, run_backtest, simulate_day, BacktestResult, DayError, DayFailure, DayOutcome,
    DaySummary, RunError, SessionFold, SCHEMA_VERSION,
};
