//! Universe selection: the day's tradable symbols by opening turnover.
//!
//! Turnover is Σ close × volume over the fine bars whose time of day lies in
//! the inclusive opening window. The top N symbols by turnover trade that
//! day; symbols with no bars in the window are never eligible.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::data::Session;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseRules {
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub top_n: usize,
}

impl Default for UniverseRules {
    fn default() -> Self {
        Self {
            window_start: NaiveTime::from_hms_opt(9, 15, 0).unwrap_or_default(),
            window_end: NaiveTime::from_hms_opt(9, 25, 0).unwrap_or_default(),
            top_n: 10,
        }
    }
}

/// A selected symbol and the turnover it was ranked by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eligible {
    pub symbol: String,
    pub turnover: f64,
}

/// Rank the session's symbols and keep the top `rules.top_n`.
///
/// Ordered by turnover descending, ties broken by symbol name.
pub fn select_universe(session: &Session, rules: &UniverseRules) -> Vec<Eligible> {
    let mut ranked: Vec<Eligible> = session
        .bars
        .iter()
        .filter_map(|(symbol, bars)| {
            let mut in_window = bars.iter().filter(|b| {
                let t = b.timestamp.time();
                t >= rules.window_start && t <= rules.window_end
            });
            let first = in_window.next()?;
            let turnover = in_window.fold(first.turnover(), |acc, b| acc + b.turnover());
            Some(Eligible {
                symbol: symbol.clone(),
                turnover,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.turnover
            .total_cmp(&a.turnover)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    ranked.truncate(rules.top_n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use chrono::{Duration, NaiveDate};

    fn session(layout: &[(&str, &[(u32, f64)])]) -> Session {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let mut s = Session::new(date);
        for (symbol, bars) in layout {
            let series = bars
                .iter()
                .map(|&(minute, volume)| Bar {
                    timestamp: date.and_hms_opt(9, 0, 0).unwrap() + Duration::minutes(minute as i64),
                    open: 10.0,
                    high: 10.0,
                    low: 10.0,
                    close: 10.0,
                    volume,
                })
                .collect();
            s.bars.insert(symbol.to_string(), series);
        }
        s
    }

    #[test]
    fn ranks_by_window_turnover() {
        let s = session(&[
            ("AAA", &[(15, 100.0), (20, 100.0)]),
            ("BBB", &[(16, 500.0)]),
            ("CCC", &[(25, 50.0), (26, 10_000.0)]), // 09:26 is outside
        ]);
        let picked = select_universe(&s, &UniverseRules::default());
        let names: Vec<&str> = picked.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(names, vec!["BBB", "AAA", "CCC"]);
        assert_eq!(picked[0].turnover, 5_000.0);
        assert_eq!(picked[2].turnover, 500.0);
    }

    #[test]
    fn window_edges_are_inclusive() {
        let s = session(&[("AAA", &[(15, 1.0), (25, 1.0)])]);
        let picked = select_universe(&s, &UniverseRules::default());
        assert_eq!(picked[0].turnover, 20.0);
    }

    #[test]
    fn symbols_without_window_bars_are_excluded() {
        let s = session(&[("AAA", &[(15, 1.0)]), ("LATE", &[(30, 1_000_000.0)])]);
        let picked = select_universe(&s, &UniverseRules::default());
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].symbol, "AAA");
    }

    #[test]
    fn top_n_and_name_tie_break() {
        let s = session(&[
            ("DDD", &[(15, 1.0)]),
            ("BBB", &[(15, 1.0)]),
            ("CCC", &[(15, 1.0)]),
        ]);
        let rules = UniverseRules {
            top_n: 2,
            ..UniverseRules::default()
        };
        let names: Vec<String> = select_universe(&s, &rules)
            .into_iter()
            .map(|e| e.symbol)
            .collect();
        assert_eq!(names, vec!["BBB", "CCC"]);
    }
}
