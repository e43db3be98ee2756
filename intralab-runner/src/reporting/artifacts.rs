//! Artifact manager for persisting run outputs.
//!
//! A run writes three files into the output directory:
//! `trade_log.csv`, `manifest.json` and `report.md`.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::{Path, PathBuf};

use intralab_core::domain::ClosedTrade;

use super::markdown::MarkdownReportGenerator;
use crate::runner::BacktestResult;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Artifact paths returned after export.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub trade_log: PathBuf,
    pub manifest: PathBuf,
    pub report_markdown: PathBuf,
}

/// Manages writing all artifacts for a run.
#[derive(Debug, Clone)]
pub struct ArtifactManager {
    output_dir: PathBuf,
}

impl ArtifactManager {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir).with_context(|| {
            format!("Failed to create output directory {}", output_dir.display())
        })?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Save complete run artifacts.
    pub fn save_run(&self, result: &BacktestResult) -> Result<ArtifactPaths> {
        let trade_log = self.output_dir.join("trade_log.csv");
        write_trade_log(&trade_log, &result.trades)?;

        let manifest = self.output_dir.join("manifest.json");
        write_manifest(&manifest, result)?;

        let report_markdown = self.output_dir.join("report.md");
        let report = MarkdownReportGenerator.generate(result);
        std::fs::write(&report_markdown, report)
            .with_context(|| format!("Failed to write report {}", report_markdown.display()))?;

        Ok(ArtifactPaths {
            trade_log,
            manifest,
            report_markdown,
        })
    }
}

/// One row of the trade log, in the column layout downstream tools expect.
#[derive(Debug, Serialize)]
struct TradeLogRow<'a> {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Stock")]
    stock: &'a str,
    #[serde(rename = "Direction")]
    direction: &'static str,
    #[serde(rename = "EntryTime")]
    entry_time: String,
    #[serde(rename = "EntryPrice")]
    entry_price: f64,
    #[serde(rename = "Qty")]
    qty: u64,
    #[serde(rename = "ExitTime")]
    exit_time: String,
    #[serde(rename = "ExitPrice")]
    exit_price: f64,
    #[serde(rename = "PnL")]
    pnl: Decimal,
    #[serde(rename = "Return")]
    return_pct: f64,
    #[serde(rename = "ExitType")]
    exit_type: &'static str,
}

impl<'a> From<&'a ClosedTrade> for TradeLogRow<'a> {
    fn from(trade: &'a ClosedTrade) -> Self {
        Self {
            date: trade.date().to_string(),
            stock: &trade.symbol,
            direction: trade.direction.as_str(),
            entry_time: trade.entry_time.format(TIME_FORMAT).to_string(),
            entry_price: trade.entry_price,
            qty: trade.quantity,
            exit_time: trade.exit_time.format(TIME_FORMAT).to_string(),
            exit_price: trade.exit_price,
            pnl: trade.pnl,
            return_pct: trade.return_pct,
            exit_type: trade.exit_reason.as_str(),
        }
    }
}

const TRADE_LOG_HEADER: [&str; 11] = [
    "Date",
    "Stock",
    "Direction",
    "EntryTime",
    "EntryPrice",
    "Qty",
    "ExitTime",
    "ExitPrice",
    "PnL",
    "Return",
    "ExitType",
];

/// Write the trade log CSV. An empty trade list still gets a header row.
pub fn write_trade_log(path: &Path, trades: &[ClosedTrade]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create trade log {}", path.display()))?;

    writer
        .write_record(TRADE_LOG_HEADER)
        .context("Failed to write trade log header")?;
    for trade in trades {
        writer
            .serialize(TradeLogRow::from(trade))
            .with_context(|| format!("Failed to write trade {} @ {}", trade.symbol, trade.entry_time))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush trade log {}", path.display()))?;
    Ok(())
}

/// Write the full run result as pretty JSON.
pub fn write_manifest(path: &Path, result: &BacktestResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result).context("Failed to serialize manifest")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write manifest {}", path.display()))?;
    Ok(())
}
