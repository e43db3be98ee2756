//! One trading session: every symbol's fine bars for a single date.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use thiserror::Error;

use super::RawBar;
use crate::domain::Bar;

/// Reasons a session cannot be simulated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("session {date} has no bars")]
    Empty { date: NaiveDate },

    #[error("{symbol} @ {timestamp}: bar has non-finite fields")]
    VoidBar {
        symbol: String,
        timestamp: NaiveDateTime,
    },

    #[error("{symbol} @ {timestamp}: bar fails OHLC sanity (o={open} h={high} l={low} c={close})")]
    InsaneBar {
        symbol: String,
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },

    #[error("{symbol}: timestamp {timestamp} does not follow {previous}")]
    NonIncreasing {
        symbol: String,
        previous: NaiveDateTime,
        timestamp: NaiveDateTime,
    },

    #[error("{symbol} @ {timestamp}: bar is outside session {date}")]
    WrongDate {
        symbol: String,
        timestamp: NaiveDateTime,
        date: NaiveDate,
    },
}

/// Fine bars per symbol for one date, each series sorted by time.
///
/// Symbols are kept in a `BTreeMap` so every iteration over a session is in
/// name order.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub date: NaiveDate,
    pub bars: BTreeMap<String, Vec<Bar>>,
}

impl Session {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            bars: BTreeMap::new(),
        }
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.bars.keys().map(String::as_str)
    }

    pub fn series(&self, symbol: &str) -> Option<&[Bar]> {
        self.bars.get(symbol).map(Vec::as_slice)
    }

    pub fn symbol_count(&self) -> usize {
        self.bars.len()
    }

    pub fn bar_count(&self) -> usize {
        self.bars.values().map(Vec::len).sum()
    }

    /// Check the session is simulable.
    ///
    /// Every bar must be finite, positive and OHLC-consistent, stamped on the
    /// session date, and strictly later than the previous bar of its symbol.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.bar_count() == 0 {
            return Err(SessionError::Empty { date: self.date });
        }

        for (symbol, bars) in &self.bars {
            let mut previous: Option<NaiveDateTime> = None;
            for bar in bars {
                if bar.is_void() {
                    return Err(SessionError::VoidBar {
                        symbol: symbol.clone(),
                        timestamp: bar.timestamp,
                    });
                }
                if !bar.is_sane() {
                    return Err(SessionError::InsaneBar {
                        symbol: symbol.clone(),
                        timestamp: bar.timestamp,
                        open: bar.open,
                        high: bar.high,
                        low: bar.low,
                        close: bar.close,
                    });
                }
                if bar.timestamp.date() != self.date {
                    return Err(SessionError::WrongDate {
                        symbol: symbol.clone(),
                        timestamp: bar.timestamp,
                        date: self.date,
                    });
                }
                if let Some(prev) = previous {
                    if bar.timestamp <= prev {
                        return Err(SessionError::NonIncreasing {
                            symbol: symbol.clone(),
                            previous: prev,
                            timestamp: bar.timestamp,
                        });
                    }
                }
                previous = Some(bar.timestamp);
            }
        }

        Ok(())
    }
}

/// Group loaded rows by calendar date, then by symbol.
///
/// Sessions come back in date order; each symbol's bars are sorted by time
/// with a stable sort, so duplicate timestamps survive for `validate` to
/// reject.
pub fn group_sessions<I>(rows: I) -> Vec<Session>
where
    I: IntoIterator<Item = RawBar>,
{
    let mut by_date: BTreeMap<NaiveDate, Session> = BTreeMap::new();
    for row in rows {
        let date = row.bar.timestamp.date();
        by_date
            .entry(date)
            .or_insert_with(|| Session::new(date))
            .bars
            .entry(row.symbol)
            .or_default()
            .push(row.bar);
    }

    let mut sessions: Vec<Session> = by_date.into_values().collect();
    for session in &mut sessions {
        for bars in session.bars.values_mut() {
            bars.sort_by_key(|b| b.timestamp);
        }
    }
    sessions
}
