//! Relative Strength Index (RSI) with Wilder smoothing.
//!
//! Seed: simple average of the first `period` gains and losses.
//! Then avg = avg + (x - avg) / period for each further change.
//! Warm-up: the first `period` values are NaN.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self { period }
    }
}

impl Indicator for Rsi {
    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        rsi_of_series(&closes, self.period)
    }
}

/// Wilder RSI over an arbitrary series.
pub fn rsi_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n <= period {
        return result;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = values[i] - values[i - 1];
        if change.is_nan() {
            return result;
        }
        avg_gain += change.max(0.0);
        avg_loss += (-change).max(0.0);
    }
    let p = period as f64;
    avg_gain /= p;
    avg_loss /= p;
    result[period] = rsi_value(avg_gain, avg_loss);

    for i in (period + 1)..n {
        let change = values[i] - values[i - 1];
        if change.is_nan() {
            return result;
        }
        avg_gain += (change.max(0.0) - avg_gain) / p;
        avg_loss += ((-change).max(0.0) - avg_loss) / p;
        result[i] = rsi_value(avg_gain, avg_loss);
    }

    result
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    match (avg_gain == 0.0, avg_loss == 0.0) {
        (true, true) => 50.0,
        (_, true) => 100.0,
        (true, false) => 0.0,
        _ => 100.0 - 100.0 / (1.0 + avg_gain / avg_loss),
    }
}
