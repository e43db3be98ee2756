//! End-to-end runner tests: CSV files on disk → sessions → day fold → artifacts.
//!
//! Fixtures are written into tempdirs on the fly. Synthetic sessions are
//! dumped to CSV so the file path and the in-memory path can be compared.

use std::io::Write;
use std::path::Path;

use rust_decimal::Decimal;

use intralab_core::data::{synthetic_sessions, Session, SyntheticParams};
use intralab_runner::{
    load_sessions, run_backtest, ArtifactManager, BacktestConfig, LoadOptions, LoadedData,
    RunError,
};

fn synthetic(days: usize) -> Vec<Session> {
    synthetic_sessions(&SyntheticParams {
        days,
        seed: 2024,
        ..SyntheticParams::default()
    })
}

/// One file per session, `dataNSE_YYYYMMDD.csv`.
fn write_sessions(dir: &Path, sessions: &[Session]) {
    for session in sessions {
        let path = dir.join(format!("dataNSE_{}.csv", session.date.format("%Y%m%d")));
        let mut file = std::fs::File::create(path).unwrap();
        writeln!(file, "time,ticker,open,high,low,close,volume").unwrap();
        for (symbol, bars) in &session.bars {
            for bar in bars {
                writeln!(
                    file,
                    "{},{},{},{},{},{},{}",
                    bar.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    symbol,
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume
                )
                .unwrap();
            }
        }
    }
}

fn load(dir: &Path) -> LoadedData {
    load_sessions(&LoadOptions {
        data_dir: dir.to_path_buf(),
        ..LoadOptions::default()
    })
    .unwrap()
}

/// Looser thresholds so synthetic walks trade often.
fn active_config() -> BacktestConfig {
    BacktestConfig::from_toml(
        r#"
        [strategy]
        rsi_period = 5
        trend_period = 2
        rsi_long_threshold = 55.0
        rsi_short_threshold = 45.0
        "#,
    )
    .unwrap()
}

#[test]
fn csv_sessions_match_in_memory_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let sessions = synthetic(3);
    write_sessions(dir.path(), &sessions);

    let loaded = load(dir.path());
    assert_eq!(loaded.files.len(), 3);
    assert_eq!(loaded.sessions, sessions);
    assert!(!loaded.has_synthetic);
}

#[test]
fn backtest_produces_trades_and_threads_capital() {
    let dir = tempfile::tempdir().unwrap();
    write_sessions(dir.path(), &synthetic(4));
    let loaded = load(dir.path());

    let result = run_backtest(&loaded, &active_config()).unwrap();
    assert!(!result.trades.is_empty());
    assert_eq!(result.days.len(), 4);
    assert!(result.failures.is_empty());
    assert_eq!(result.metrics.trade_count, result.trades.len());

    for pair in result.days.windows(2) {
        assert_eq!(pair[0].end_capital, pair[1].start_capital);
    }
    let last = result.days.last().unwrap();
    assert_eq!(result.final_capital, last.end_capital);

    let pnl: Decimal = result.trades.iter().map(|t| t.pnl).sum();
    assert_eq!(pnl, result.final_capital - result.initial_capital);
    for day in &result.days {
        assert_eq!(day.pnl, day.end_capital - day.start_capital);
    }
}

#[test]
fn backtest_is_deterministic_across_thread_counts() {
    let dir = tempfile::tempdir().unwrap();
    write_sessions(dir.path(), &synthetic(3));
    let loaded = load(dir.path());

    let mut single = active_config();
    single.backtest.threads = Some(1);
    let mut many = active_config();
    many.backtest.threads = Some(4);

    let a = run_backtest(&loaded, &single).unwrap();
    let b = run_backtest(&loaded, &many).unwrap();
    let c = run_backtest(&loaded, &active_config()).unwrap();
    assert_eq!(a.trades, b.trades);
    assert_eq!(a.trades, c.trades);
    assert_eq!(a.final_capital, c.final_capital);
}

#[test]
fn malformed_day_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let mut sessions = synthetic(3);
    let bars = sessions[1].bars.values_mut().next().unwrap();
    bars[10].high = bars[10].low * 0.5;
    write_sessions(dir.path(), &sessions);
    let loaded = load(dir.path());

    let result = run_backtest(&loaded, &active_config()).unwrap();
    assert_eq!(result.days.len(), 2);
    assert_eq!(result.failures.len(), 1);

    let failure = &result.failures[0];
    assert_eq!(failure.date, sessions[1].date);
    assert_eq!(failure.capital, result.days[0].end_capital);
    assert_eq!(result.days[1].start_capital, failure.capital);
    assert!(result.trades.iter().all(|t| t.date() != failure.date));
}

#[test]
fn invalid_config_is_rejected_before_running() {
    let dir = tempfile::tempdir().unwrap();
    write_sessions(dir.path(), &synthetic(1));
    let loaded = load(dir.path());

    let mut config = active_config();
    config.risk.stop_loss_pct = 0.0;
    assert!(matches!(
        run_backtest(&loaded, &config),
        Err(RunError::Config(_))
    ));
}

#[test]
fn artifacts_are_written() {
    let data = tempfile::tempdir().unwrap();
    write_sessions(data.path(), &synthetic(2));
    let loaded = load(data.path());
    let result = run_backtest(&loaded, &active_config()).unwrap();

    let out = tempfile::tempdir().unwrap();
    let manager = ArtifactManager::new(out.path().join("run")).unwrap();
    let paths = manager.save_run(&result).unwrap();
    assert!(paths.trade_log.exists());
    assert!(paths.manifest.exists());
    assert!(paths.report_markdown.exists());

    let log = std::fs::read_to_string(&paths.trade_log).unwrap();
    let mut lines = log.lines();
    assert_eq!(
        lines.next(),
        Some("Date,Stock,Direction,EntryTime,EntryPrice,Qty,ExitTime,ExitPrice,PnL,Return,ExitType")
    );
    assert_eq!(lines.count(), result.trades.len());

    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.manifest).unwrap()).unwrap();
    assert_eq!(manifest["schema_version"], 1);
    assert_eq!(manifest["config_hash"], result.config_hash.as_str());
    assert_eq!(manifest["dataset_hash"], loaded.dataset_hash.as_str());
    assert_eq!(manifest["has_synthetic"], false);
    assert_eq!(
        manifest["trades"].as_array().unwrap().len(),
        result.trades.len()
    );

    let report = std::fs::read_to_string(&paths.report_markdown).unwrap();
    assert!(report.starts_with("# IntraLab Run Report"));
    assert!(report.contains("## Summary"));
}

#[test]
fn flat_market_produces_no_trades() {
    let dir = tempfile::tempdir().unwrap();
    let mut body = String::from("time,ticker,open,high,low,close,volume\n");
    for minute in 0..200 {
        let h = 9 + (15 + minute) / 60;
        let m = (15 + minute) % 60;
        for ticker in ["AAA", "BBB"] {
            body.push_str(&format!(
                "2024-01-02 {h:02}:{m:02}:00,{ticker},100,100,100,100,500\n"
            ));
        }
    }
    std::fs::write(dir.path().join("dataNSE_flat.csv"), body).unwrap();
    let loaded = load(dir.path());

    let result = run_backtest(&loaded, &BacktestConfig::default()).unwrap();
    assert!(result.trades.is_empty());
    assert_eq!(result.final_capital, result.initial_capital);
    assert_eq!(result.metrics.total_return, 0.0);

    let out = tempfile::tempdir().unwrap();
    let paths = ArtifactManager::new(out.path()).unwrap().save_run(&result).unwrap();
    let log = std::fs::read_to_string(&paths.trade_log).unwrap();
    assert_eq!(log.lines().count(), 1);
    let report = std::fs::read_to_string(&paths.report_markdown).unwrap();
    assert!(report.contains("No trades were generated during the backtest period."));
}

#[test]
fn synthetic_fallback_is_tagged_in_the_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = load_sessions(&LoadOptions {
        data_dir: dir.path().join("nothing-here"),
        synthetic: true,
        days: Some(1),
        ..LoadOptions::default()
    })
    .unwrap();
    let result = run_backtest(&loaded, &BacktestConfig::default()).unwrap();
    assert!(result.has_synthetic);

    let report = intralab_runner::MarkdownReportGenerator.generate(&result);
    assert!(report.contains("Synthetic data"));
}
