//! Fill simulator: resolves a stop-entry intent against fine bars.
//!
//! Scans bars stamped strictly after detection, up to and including
//! detection + window. The first bar that trades through the trigger fills.
//!
//! Gap rule: if the bar opens beyond the trigger (above it for a buy stop,
//! below it for a sell stop) the fill is at the open, which is worse than
//! the trigger. Otherwise the fill is at the trigger.

use chrono::{Duration, NaiveDateTime};

use crate::domain::{Bar, Direction, TradeIntent};

/// An executed entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub time: NaiveDateTime,
    pub price: f64,
    /// Index of the filling bar in the fine series that was scanned.
    pub bar_index: usize,
    /// True if the bar opened through the trigger.
    pub gapped: bool,
}

/// Outcome of a fill attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FillOutcome {
    Filled(Fill),
    /// No bar reached the trigger inside the window.
    Expired,
}

/// Resolve `intent` against the symbol's time-ordered fine bars.
pub fn simulate_fill(intent: &TradeIntent, fine: &[Bar], window: Duration) -> FillOutcome {
    let deadline = intent.detected_at + window;
    let start = fine.partition_point(|b| b.timestamp <= intent.detected_at);
    let trigger = intent.trigger_price;

    for (offset, bar) in fine[start..].iter().enumerate() {
        if bar.timestamp > deadline {
            break;
        }
        let (reached, gapped) = match intent.direction {
            Direction::Long => (bar.high >= trigger, bar.open > trigger),
            Direction::Short => (bar.low <= trigger, bar.open < trigger),
        };
        if reached {
            return FillOutcome::Filled(Fill {
                time: bar.timestamp,
                price: if gapped { bar.open } else { trigger },
                bar_index: start + offset,
                gapped,
            });
        }
    }

    FillOutcome::Expired
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn bar(t: NaiveDateTime, open: f64, high: f64, low: f64) -> Bar {
        Bar {
            timestamp: t,
            open,
            high,
            low,
            close: (high + low) / 2.0,
            volume: 500.0,
        }
    }

    fn intent(direction: Direction, trigger_price: f64) -> TradeIntent {
        TradeIntent {
            symbol: "TEST".into(),
            direction,
            detected_at: at(11, 0),
            trigger_price,
        }
    }

    fn window() -> Duration {
        Duration::minutes(10)
    }

    #[test]
    fn long_fills_at_trigger_when_not_gapped() {
        let fine = vec![
            bar(at(11, 0), 105.0, 107.0, 104.0), // detection bar itself is ignored
            bar(at(11, 1), 105.0, 105.5, 104.8),
            bar(at(11, 2), 105.5, 106.3, 105.2),
        ];
        match simulate_fill(&intent(Direction::Long, 106.0), &fine, window()) {
            FillOutcome::Filled(fill) => {
                assert_eq!(fill.time, at(11, 2));
                assert_eq!(fill.price, 106.0);
                assert_eq!(fill.bar_index, 2);
                assert!(!fill.gapped);
            }
            FillOutcome::Expired => panic!("expected fill"),
        }
    }

    #[test]
    fn long_gap_fills_at_open() {
        let fine = vec![bar(at(11, 1), 106.2, 106.9, 106.1)];
        match simulate_fill(&intent(Direction::Long, 106.0), &fine, window()) {
            FillOutcome::Filled(fill) => {
                assert_eq!(fill.price, 106.2);
                assert!(fill.gapped);
            }
            FillOutcome::Expired => panic!("expected fill"),
        }
    }

    #[test]
    fn short_fills_at_trigger_or_open() {
        let fine = vec![bar(at(11, 1), 95.2, 95.4, 94.9)];
        assert!(matches!(
            simulate_fill(&intent(Direction::Short, 95.0), &fine, window()),
            FillOutcome::Filled(Fill { price, gapped: false, .. }) if price == 95.0
        ));

        let gapped = vec![bar(at(11, 3), 94.5, 94.8, 94.0)];
        assert!(matches!(
            simulate_fill(&intent(Direction::Short, 95.0), &gapped, window()),
            FillOutcome::Filled(Fill { price, gapped: true, .. }) if price == 94.5
        ));
    }

    #[test]
    fn window_end_is_inclusive() {
        let fine = vec![
            bar(at(11, 5), 100.0, 100.5, 99.5),
            bar(at(11, 10), 100.0, 107.0, 99.5),
        ];
        assert!(matches!(
            simulate_fill(&intent(Direction::Long, 106.0), &fine, window()),
            FillOutcome::Filled(Fill { bar_index: 1, .. })
        ));
    }

    #[test]
    fn expires_after_window() {
        let fine = vec![
            bar(at(11, 5), 100.0, 100.5, 99.5),
            bar(at(11, 11), 100.0, 107.0, 99.5),
        ];
        assert_eq!(
            simulate_fill(&intent(Direction::Long, 106.0), &fine, window()),
            FillOutcome::Expired
        );
    }

    #[test]
    fn expires_on_empty_series() {
        assert_eq!(
            simulate_fill(&intent(Direction::Short, 95.0), &[], window()),
            FillOutcome::Expired
        );
    }
}
