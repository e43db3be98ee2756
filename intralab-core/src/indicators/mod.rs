//! Indicator feed: resampling, moving averages, the oscillator, and the
//! per-coarse-bar rows the signal detector reads.
//!
//! Indicators are pure functions: bar history in, numeric series out. They
//! are precomputed once per symbol per session and queried by coarse-bar
//! index. No value at bar t may depend on bars after t.

pub mod ema;
pub mod feed;
pub mod resample;
pub mod rsi;

pub use ema::Ema;
pub use feed::{IndicatorFeed, IndicatorParams, IndicatorRow};
pub use resample::resample;
pub use rsi::Rsi;

use crate::domain::Bar;

/// Trait for close-series indicators.
///
/// Indicators take a full bar series and produce an output series of the
/// same length. Warm-up values are `f64::NAN`.
pub trait Indicator: Send + Sync {
    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Create one-minute bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 15, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: start + chrono::Duration::minutes(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
