//! Per-coarse-bar indicator rows.
//!
//! Fast/slow EMAs and RSI run on coarse closes. The trend reference is an
//! EMA over slower-timeframe closes, merged as-of: each coarse bar sees the
//! value of the latest slow bar whose label is at or before its own
//! timestamp.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::ema::Ema;
use super::resample::resample;
use super::rsi::Rsi;
use super::Indicator;
use crate::domain::Bar;

/// Indicator periods and the trend timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub rsi_period: usize,
    /// Width of the slower timeframe the trend EMA runs on, in minutes.
    pub trend_minutes: u32,
    pub trend_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            fast_period: 3,
            slow_period: 10,
            rsi_period: 14,
            trend_minutes: 60,
            trend_period: 50,
        }
    }
}

impl IndicatorParams {
    pub fn trend_width(&self) -> Duration {
        Duration::minutes(i64::from(self.trend_minutes))
    }
}

/// Indicator values for one coarse bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub fast: f64,
    pub slow: f64,
    /// None until the first slow-timeframe bar has closed.
    pub trend: Option<f64>,
    pub rsi: f64,
}

/// Rows aligned by index with the coarse bars they were built from.
#[derive(Debug, Clone, Default)]
pub struct IndicatorFeed {
    rows: Vec<Option<IndicatorRow>>,
}

impl IndicatorFeed {
    /// Build the feed for one symbol's session.
    ///
    /// `fine` feeds the slow timeframe; `coarse` must be the resampled fine
    /// series. A row is present only where fast, slow and RSI are defined.
    pub fn build(symbol: &str, fine: &[Bar], coarse: &[Bar], params: &IndicatorParams) -> Self {
        let fast = Ema::new(params.fast_period).compute(coarse);
        let slow = Ema::new(params.slow_period).compute(coarse);
        let rsi = Rsi::new(params.rsi_period).compute(coarse);

        let trend_bars = resample(fine, params.trend_width());
        let trend = Ema::new(params.trend_period).compute(&trend_bars);

        let rows = coarse
            .iter()
            .enumerate()
            .map(|(i, bar)| {
                if fast[i].is_nan() || slow[i].is_nan() || rsi[i].is_nan() {
                    return None;
                }
                Some(IndicatorRow {
                    timestamp: bar.timestamp,
                    symbol: symbol.to_string(),
                    fast: fast[i],
                    slow: slow[i],
                    trend: as_of(&trend_bars, &trend, bar.timestamp),
                    rsi: rsi[i],
                })
            })
            .collect();

        Self { rows }
    }

    pub fn row(&self, index: usize) -> Option<&IndicatorRow> {
        self.rows.get(index).and_then(|r| r.as_ref())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows past warm-up.
    pub fn ready_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_some()).count()
    }
}

/// Latest value whose bar label is `<= at`.
fn as_of(bars: &[Bar], values: &[f64], at: NaiveDateTime) -> Option<f64> {
    let idx = bars.partition_point(|b| b.timestamp <= at);
    if idx == 0 {
        return None;
    }
    let v = values[idx - 1];
    (!v.is_nan()).then_some(v)
}
