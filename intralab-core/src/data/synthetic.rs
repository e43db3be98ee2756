//! Synthetic minute sessions for development runs and benchmarks.
//!
//! A seeded random walk per symbol, with a per-session drift so some days
//! trend. Output is fully determined by the parameters: each (seed, date,
//! symbol) triple gets its own RNG stream derived via BLAKE3, independent of
//! generation order.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::session::Session;
use crate::domain::Bar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticParams {
    pub symbols: Vec<String>,
    pub start: NaiveDate,
    /// Number of weekday sessions to generate.
    pub days: usize,
    pub open_time: NaiveTime,
    /// Time of the last minute bar.
    pub close_time: NaiveTime,
    pub seed: u64,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            symbols: [
                "RELIANCE", "TCS", "INFY", "HDFCBANK", "ICICIBANK", "SBIN", "ITC", "LT",
                "AXISBANK", "KOTAKBANK", "BHARTIARTL", "HINDUNILVR",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            days: 5,
            open_time: NaiveTime::from_hms_opt(9, 15, 0).unwrap_or_default(),
            close_time: NaiveTime::from_hms_opt(15, 29, 0).unwrap_or_default(),
            seed: 42,
        }
    }
}

/// Generate `params.days` weekday sessions starting at `params.start`.
///
/// Prices carry over between sessions: each symbol opens a session at its
/// previous close.
pub fn synthetic_sessions(params: &SyntheticParams) -> Vec<Session> {
    let mut last_close: BTreeMap<&str, f64> = params
        .symbols
        .iter()
        .enumerate()
        .map(|(i, s)| (s.as_str(), 100.0 + 50.0 * i as f64))
        .collect();

    let mut sessions = Vec::with_capacity(params.days);
    let mut date = params.start;
    while sessions.len() < params.days {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date += Duration::days(1);
            continue;
        }

        let mut session = Session::new(date);
        for symbol in &params.symbols {
            let start_price = last_close.get(symbol.as_str()).copied().unwrap_or(100.0);
            let bars = synthetic_series(params, date, symbol, start_price);
            if let Some(last) = bars.last() {
                last_close.insert(symbol.as_str(), last.close);
            }
            session.bars.insert(symbol.clone(), bars);
        }
        sessions.push(session);
        date += Duration::days(1);
    }

    sessions
}

fn synthetic_series(params: &SyntheticParams, date: NaiveDate, symbol: &str, start_price: f64) -> Vec<Bar> {
    let mut rng = rng_for(params.seed, date, symbol);

    let drift: f64 = rng.gen_range(-0.0004..0.0004);
    let volume_scale: f64 = rng.gen_range(0.5..5.0);

    let mut bars = Vec::new();
    let mut price = start_price;
    let mut timestamp = date.and_time(params.open_time);
    let end = date.and_time(params.close_time);

    while timestamp <= end {
        let ret = drift + rng.gen_range(-0.0015..0.0015);
        let open = price;
        let close = price * (1.0 + ret);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.0008));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.0008));
        let volume = (rng.gen_range(1_000.0..20_000.0) * volume_scale).round();

        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        timestamp += Duration::minutes(1);
    }

    bars
}

fn rng_for(seed: u64, date: NaiveDate, symbol: &str) -> StdRng {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(date.to_string().as_bytes());
    hasher.update(symbol.as_bytes());
    StdRng::from_seed(*hasher.finalize().as_bytes())
}
