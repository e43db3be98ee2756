//! Session loading for the runner.
//!
//! Reads every `{prefix}*.csv` file in the data directory in sorted filename
//! order, concatenates the rows, and groups them into per-date sessions.
//! Fallback policy:
//! 1. If matching files exist → load them
//! 2. If none and `synthetic` is set → generate synthetic sessions (tagged)
//! 3. Otherwise → fail with a clear error
//!
//! A malformed row fails the whole load. Loading happens before the day
//! fold, so it is outside per-day failure isolation.

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use intralab_core::data::{group_sessions, synthetic_sessions, RawBar, Session, SyntheticParams};
use intralab_core::domain::Bar;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(
        "no '{prefix}*.csv' files in {} (use --synthetic for synthetic data)",
        dir.display()
    )]
    NoFiles { dir: PathBuf, prefix: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {source}", path.display())]
    Csv {
        path: PathBuf,
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("{}:{line}: unrecognized timestamp '{value}'", path.display())]
    BadTimestamp {
        path: PathBuf,
        line: u64,
        value: String,
    },
}

/// Options controlling how sessions are loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub data_dir: PathBuf,
    pub file_prefix: String,
    /// Generate synthetic sessions when no files match.
    pub synthetic: bool,
    /// Keep only the first N sessions. Also the synthetic session count.
    pub days: Option<usize>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            file_prefix: "dataNSE_".into(),
            synthetic: false,
            days: None,
        }
    }
}

/// Result of loading, including provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    /// Sessions in date order.
    pub sessions: Vec<Session>,
    /// Files read, in read order. Empty for synthetic data.
    pub files: Vec<PathBuf>,
    pub row_count: usize,
    /// BLAKE3 over every bar in date, symbol, time order.
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

/// One CSV row. Extra columns are ignored.
#[derive(Debug, Deserialize)]
struct CsvRow {
    time: String,
    ticker: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

const SYNTHETIC_DEFAULT_DAYS: usize = 5;

/// Load sessions according to `opts`.
pub fn load_sessions(opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    let files = matching_files(&opts.data_dir, &opts.file_prefix)?;

    if files.is_empty() {
        if !opts.synthetic {
            return Err(LoadError::NoFiles {
                dir: opts.data_dir.clone(),
                prefix: opts.file_prefix.clone(),
            });
        }
        warn!("no input files; generating synthetic sessions, results will be tagged as synthetic");
        let params = SyntheticParams {
            days: opts.days.unwrap_or(SYNTHETIC_DEFAULT_DAYS),
            ..SyntheticParams::default()
        };
        let sessions = synthetic_sessions(&params);
        let row_count = sessions.iter().map(Session::bar_count).sum();
        return Ok(LoadedData {
            dataset_hash: compute_dataset_hash(&sessions),
            sessions,
            files,
            row_count,
            has_synthetic: true,
        });
    }

    let mut rows = Vec::new();
    for path in &files {
        read_file(path, &mut rows)?;
    }
    let row_count = rows.len();

    let mut sessions = group_sessions(rows);
    if let Some(days) = opts.days {
        sessions.truncate(days);
    }

    info!(
        files = files.len(),
        rows = row_count,
        sessions = sessions.len(),
        "loaded session data"
    );

    Ok(LoadedData {
        dataset_hash: compute_dataset_hash(&sessions),
        sessions,
        files,
        row_count,
        has_synthetic: false,
    })
}

/// `{prefix}*.csv` files in `dir`, sorted by name. A missing directory has none.
fn matching_files(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, LoadError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(prefix) && name.ends_with(".csv") && entry.path().is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

fn read_file(path: &Path, out: &mut Vec<RawBar>) -> Result<(), LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            line: 0,
            source,
        })?;
    let headers = reader
        .headers()
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            line: 1,
            source,
        })?
        .clone();

    for record in reader.records() {
        let record = record.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            line: source.position().map_or(0, |p| p.line()),
            source,
        })?;
        let line = record.position().map_or(0, |p| p.line());
        let row: CsvRow = record
            .deserialize(Some(&headers))
            .map_err(|source| LoadError::Csv {
                path: path.to_path_buf(),
                line,
                source,
            })?;
        let timestamp = parse_timestamp(&row.time).ok_or_else(|| LoadError::BadTimestamp {
            path: path.to_path_buf(),
            line,
            value: row.time.clone(),
        })?;
        out.push(RawBar {
            symbol: row.ticker,
            bar: Bar {
                timestamp,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            },
        });
    }
    Ok(())
}

/// Parse an exchange timestamp.
///
/// Accepts `YYYY-MM-DD HH:MM[:SS[.fff]]`, the `T`-separated form, and either
/// with a UTC offset. An offset is dropped: the wall-clock time is kept.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt.naive_local());
        }
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    None
}

/// Compute a deterministic BLAKE3 hash over all session data.
///
/// Sessions are in date order and symbols in name order (`BTreeMap`), so
/// the hash does not depend on file order or row order within a file.
fn compute_dataset_hash(sessions: &[Session]) -> String {
    let mut hasher = blake3::Hasher::new();
    for session in sessions {
        hasher.update(session.date.to_string().as_bytes());
        for (symbol, bars) in &session.bars {
            hasher.update(symbol.as_bytes());
            for bar in bars {
                hasher.update(bar.timestamp.to_string().as_bytes());
                hasher.update(&bar.open.to_le_bytes());
                hasher.update(&bar.high.to_le_bytes());
                hasher.update(&bar.low.to_le_bytes());
                hasher.update(&bar.close.to_le_bytes());
                hasher.update(&bar.volume.to_le_bytes());
            }
        }
    }
    hasher.finalize().to_hex().to_string()
}
