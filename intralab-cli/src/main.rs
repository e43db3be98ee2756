//! IntraLab CLI: run, universe and config commands.
//!
//! Commands:
//! - `run`: load sessions, run the backtest, print the summary, write artifacts
//! - `universe`: print each session's eligible symbols with their turnover
//! - `config`: print the default configuration as TOML

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use intralab_core::universe::select_universe;
use intralab_runner::{
    load_sessions, run_backtest, ArtifactManager, BacktestConfig, BacktestResult, LoadOptions,
};

#[derive(Parser)]
#[command(
    name = "intralab",
    about = "IntraLab CLI: intraday momentum backtester"
)]
struct Cli {
    /// Log level: trace, debug, info, warn, error.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a backtest over every session in the data directory.
    Run {
        /// Path to a TOML config file. Defaults to the reference configuration.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Data directory (overrides the config).
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Output directory for artifacts (overrides the config).
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Base capital (overrides the config).
        #[arg(long)]
        capital: Option<f64>,

        /// Use synthetic sessions when no data files are found.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Only the first N sessions (also the synthetic session count).
        #[arg(long)]
        days: Option<usize>,
    },
    /// Print each session's eligible symbols ranked by opening turnover.
    Universe {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Data directory (overrides the config).
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Use synthetic sessions when no data files are found.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Only the first N sessions.
        #[arg(long)]
        days: Option<usize>,
    },
    /// Print the default configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run {
            config,
            data_dir,
            output_dir,
            capital,
            synthetic,
            days,
        } => run_cmd(config, data_dir, output_dir, capital, synthetic, days),
        Commands::Universe {
            config,
            data_dir,
            synthetic,
            days,
        } => universe_cmd(config, data_dir, synthetic, days),
        Commands::Config => {
            print!("{}", BacktestConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<PathBuf>) -> Result<BacktestConfig> {
    match path {
        Some(path) => BacktestConfig::from_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(BacktestConfig::default()),
    }
}

fn load_options(config: &BacktestConfig, synthetic: bool, days: Option<usize>) -> LoadOptions {
    LoadOptions {
        data_dir: config.backtest.data_dir.clone(),
        file_prefix: config.backtest.file_prefix.clone(),
        synthetic,
        days,
    }
}

fn run_cmd(
    config_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    capital: Option<f64>,
    synthetic: bool,
    days: Option<usize>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(dir) = data_dir {
        config.backtest.data_dir = dir;
    }
    if let Some(dir) = output_dir {
        config.backtest.output_dir = dir;
    }
    if let Some(capital) = capital {
        config.backtest.base_capital = capital;
    }
    if days == Some(0) {
        bail!("--days must be at least 1");
    }

    let loaded = load_sessions(&load_options(&config, synthetic, days))?;
    if loaded.sessions.is_empty() {
        bail!("no sessions found in {}", config.backtest.data_dir.display());
    }

    let result = run_backtest(&loaded, &config)?;
    print_summary(&result);

    let manager = ArtifactManager::new(&config.backtest.output_dir)?;
    let paths = manager.save_run(&result)?;
    println!();
    println!("Trade log saved to: {}", paths.trade_log.display());
    println!("Artifacts saved to: {}", manager.output_dir().display());

    Ok(())
}

fn universe_cmd(
    config_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    synthetic: bool,
    days: Option<usize>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(dir) = data_dir {
        config.backtest.data_dir = dir;
    }
    config.validate()?;

    let loaded = load_sessions(&load_options(&config, synthetic, days))?;
    let rules = config.universe_rules();
    for session in &loaded.sessions {
        let eligible = select_universe(session, &rules);
        println!(
            "{} ({} of {} symbols)",
            session.date,
            eligible.len(),
            session.symbol_count()
        );
        for (rank, e) in eligible.iter().enumerate() {
            println!("  {:>2}. {:<12} {:>18.2}", rank + 1, e.symbol, e.turnover);
        }
    }
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    if let (Some(start), Some(end)) = (result.start_date, result.end_date) {
        println!("Period:         {start} to {end}");
    }
    println!(
        "Sessions:       {} ({} skipped)",
        result.days.len() + result.failures.len(),
        result.failures.len()
    );
    println!(
        "Intents:        {} ({} filled, {} expired)",
        result.stats.intents, result.stats.fills, result.stats.expired
    );
    println!("Trades:         {}", m.trade_count);

    if m.trade_count == 0 {
        println!();
        println!("No trades were generated during the backtest period.");
    } else {
        println!();
        println!("--- Performance ---");
        println!("Total Return:   {:.2}%", m.total_return * 100.0);
        println!("Win Rate:       {:.2}%", m.win_rate * 100.0);
        println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
        println!("Sharpe Ratio:   {:.2}", m.sharpe);
        println!("Profit Factor:  {:.2}", m.profit_factor);
        println!("Final Capital:  {:.2}", result.final_capital);
        for (reason, count) in &m.exit_reasons {
            println!("  {reason:<18} {count}");
        }
    }

    for failure in &result.failures {
        println!("WARNING: {} skipped: {}", failure.date, failure.reason);
    }
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}
