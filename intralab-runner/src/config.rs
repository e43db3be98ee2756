//! Serializable backtest configuration (TOML).
//!
//! ```toml
//! [backtest]
//! base_capital = 1000000.0
//! data_dir = "data"
//! file_prefix = "dataNSE_"
//!
//! [strategy]
//! coarse_minutes = 10
//! fast_period = 3
//! slow_period = 10
//! rsi_period = 14
//! rsi_long_threshold = 60.0
//! rsi_short_threshold = 30.0
//! trend_minutes = 60
//! trend_period = 50
//!
//! [risk]
//! risk_per_trade = 0.005
//! stop_loss_pct = 0.005
//! target_pct = 0.02
//! trail_trigger_pct = 0.005
//! trail_step_pct = 0.0075
//!
//! [execution]
//! fill_window_minutes = 10
//! short_lookback_minutes = 5
//!
//! [universe]
//! window_start = "09:15:00"
//! window_end = "09:25:00"
//! top_n = 10
//! ```
//!
//! Every field is optional; missing fields take the reference value.

use chrono::NaiveTime;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use intralab_core::engine::{BracketParams, EngineConfig, SignalRules, SizingRules};
use intralab_core::indicators::IndicatorParams;
use intralab_core::universe::UniverseRules;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config TOML: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("failed to serialize config for hashing: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {field} {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Full configuration for one backtest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub strategy: StrategySection,
    pub risk: RiskSection,
    pub execution: ExecutionSection,
    pub universe: UniverseSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub base_capital: f64,
    pub data_dir: PathBuf,
    /// Input files are `{data_dir}/{file_prefix}*.csv`.
    pub file_prefix: String,
    pub output_dir: PathBuf,
    /// Worker threads for per-symbol simulation. Unset uses rayon's global pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            base_capital: 1_000_000.0,
            data_dir: PathBuf::from("data"),
            file_prefix: "dataNSE_".into(),
            output_dir: PathBuf::from("output"),
            threads: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySection {
    pub coarse_minutes: u32,
    pub fast_period: usize,
    pub slow_period: usize,
    pub rsi_period: usize,
    pub rsi_long_threshold: f64,
    pub rsi_short_threshold: f64,
    pub trend_minutes: u32,
    pub trend_period: usize,
}

impl Default for StrategySection {
    fn default() -> Self {
        Self {
            coarse_minutes: 10,
            fast_period: 3,
            slow_period: 10,
            rsi_period: 14,
            rsi_long_threshold: 60.0,
            rsi_short_threshold: 30.0,
            trend_minutes: 60,
            trend_period: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSection {
    pub risk_per_trade: f64,
    pub stop_loss_pct: f64,
    pub target_pct: f64,
    pub trail_trigger_pct: f64,
    pub trail_step_pct: f64,
}

impl Default for RiskSection {
    fn default() -> Self {
        Self {
            risk_per_trade: 0.005,
            stop_loss_pct: 0.005,
            target_pct: 0.02,
            trail_trigger_pct: 0.005,
            trail_step_pct: 0.0075,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSection {
    pub fill_window_minutes: u32,
    pub short_lookback_minutes: u32,
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            fill_window_minutes: 10,
            short_lookback_minutes: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseSection {
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub top_n: usize,
}

impl Default for UniverseSection {
    fn default() -> Self {
        let rules = UniverseRules::default();
        Self {
            window_start: rules.window_start,
            window_end: rules.window_end,
            top_n: rules.top_n,
        }
    }
}

impl BacktestConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject configurations the engine cannot run meaningfully.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.backtest;
        self.initial_capital()?;
        if b.threads == Some(0) {
            return invalid("backtest.threads", "must be at least 1".into());
        }

        let s = &self.strategy;
        for (field, value) in [
            ("strategy.fast_period", s.fast_period),
            ("strategy.slow_period", s.slow_period),
            ("strategy.rsi_period", s.rsi_period),
            ("strategy.trend_period", s.trend_period),
        ] {
            if value == 0 {
                return invalid(field, "must be at least 1".into());
            }
        }
        for (field, value) in [
            ("strategy.coarse_minutes", s.coarse_minutes),
            ("strategy.trend_minutes", s.trend_minutes),
            ("execution.fill_window_minutes", self.execution.fill_window_minutes),
            ("execution.short_lookback_minutes", self.execution.short_lookback_minutes),
        ] {
            if value == 0 {
                return invalid(field, "must be at least 1 minute".into());
            }
        }
        if s.rsi_long_threshold <= s.rsi_short_threshold {
            return invalid(
                "strategy.rsi_long_threshold",
                format!(
                    "({}) must be above rsi_short_threshold ({})",
                    s.rsi_long_threshold, s.rsi_short_threshold
                ),
            );
        }

        let r = &self.risk;
        for (field, value) in [
            ("risk.risk_per_trade", r.risk_per_trade),
            ("risk.stop_loss_pct", r.stop_loss_pct),
            ("risk.target_pct", r.target_pct),
            ("risk.trail_trigger_pct", r.trail_trigger_pct),
            ("risk.trail_step_pct", r.trail_step_pct),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return invalid(field, format!("must be in (0, 1), got {value}"));
            }
        }

        let u = &self.universe;
        if u.window_start > u.window_end {
            return invalid(
                "universe.window_start",
                format!("({}) is after window_end ({})", u.window_start, u.window_end),
            );
        }
        if u.top_n == 0 {
            return invalid("universe.top_n", "must be at least 1".into());
        }

        Ok(())
    }

    /// Engine parameters derived from the strategy, risk and execution sections.
    pub fn to_engine_config(&self) -> EngineConfig {
        let s = &self.strategy;
        let r = &self.risk;
        EngineConfig {
            coarse_minutes: s.coarse_minutes,
            indicators: IndicatorParams {
                fast_period: s.fast_period,
                slow_period: s.slow_period,
                rsi_period: s.rsi_period,
                trend_minutes: s.trend_minutes,
                trend_period: s.trend_period,
            },
            signal: SignalRules {
                rsi_long_threshold: s.rsi_long_threshold,
                rsi_short_threshold: s.rsi_short_threshold,
                short_lookback_minutes: self.execution.short_lookback_minutes,
            },
            fill_window_minutes: self.execution.fill_window_minutes,
            bracket: BracketParams {
                stop_loss_pct: r.stop_loss_pct,
                target_pct: r.target_pct,
                trail_trigger_pct: r.trail_trigger_pct,
                trail_step_pct: r.trail_step_pct,
            },
            sizing: SizingRules {
                risk_per_trade: r.risk_per_trade,
                stop_loss_pct: r.stop_loss_pct,
            },
        }
    }

    /// Base capital as the ledger's decimal.
    pub fn initial_capital(&self) -> Result<Decimal, ConfigError> {
        let capital = self.backtest.base_capital;
        match Decimal::from_f64(capital) {
            Some(value) if value > Decimal::ZERO => Ok(value),
            _ => Err(ConfigError::Invalid {
                field: "backtest.base_capital",
                reason: format!("must be a positive amount, got {capital}"),
            }),
        }
    }

    pub fn universe_rules(&self) -> UniverseRules {
        UniverseRules {
            window_start: self.universe.window_start,
            window_end: self.universe.window_end,
            top_n: self.universe.top_n,
        }
    }

    /// BLAKE3 hash of the canonical JSON form. Identical configs hash equal.
    pub fn config_hash(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_vec(self)?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }
}

fn invalid(field: &'static str, reason: String) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid { field, reason })
}
