//! Bracket position state machine.
//!
//! ```text
//! Armed ──(extreme moves trail_trigger_pct in favor)──▶ Trailing
//!   │                                                      │
//!   └──▶ StopLoss | Target | EndOfDaySquareOff    TrailingSL | Target | EndOfDaySquareOff
//! ```
//!
//! Per fine bar, starting with the fill bar:
//! 1. exit check against the stop, then the target (stop wins a tie)
//! 2. extreme favorable price update
//! 3. one-way trailing activation
//! 4. trailing ratchet: stop follows the extreme by trail_step_pct, tighten only
//!
//! The stop and target are resting orders, so exits fill at their level.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::fill::Fill;
use super::ratchet::RatchetState;
use crate::domain::{Bar, Direction, ExitReason, TradeFill, TradeIntent};

/// Stop, target and trailing fractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketParams {
    pub stop_loss_pct: f64,
    pub target_pct: f64,
    pub trail_trigger_pct: f64,
    pub trail_step_pct: f64,
}

impl Default for BracketParams {
    fn default() -> Self {
        Self {
            stop_loss_pct: 0.005,
            target_pct: 0.02,
            trail_trigger_pct: 0.005,
            trail_step_pct: 0.0075,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    /// Filled; stop at its initial level.
    Armed,
    /// Stop is following the extreme. Never reverts to Armed.
    Trailing,
}

/// A terminal transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exit {
    pub time: NaiveDateTime,
    pub price: f64,
    pub reason: ExitReason,
}

/// Result of advancing a position by one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Holding,
    Exited(Exit),
}

/// A live position for one symbol.
#[derive(Debug, Clone)]
pub struct OpenPosition {
    pub symbol: String,
    pub direction: Direction,
    pub detected_at: NaiveDateTime,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    stop: RatchetState,
    target_price: f64,
    state: PositionState,
    extreme: f64,
    trail_trigger_pct: f64,
    trail_step_pct: f64,
    last_bar: Option<Bar>,
}

impl OpenPosition {
    /// Open a position from a filled intent.
    pub fn open(intent: &TradeIntent, fill: &Fill, params: &BracketParams) -> Self {
        let sign = intent.direction.sign();
        let entry = fill.price;
        Self {
            symbol: intent.symbol.clone(),
            direction: intent.direction,
            detected_at: intent.detected_at,
            entry_time: fill.time,
            entry_price: entry,
            stop: RatchetState::new(intent.direction, entry * (1.0 - sign * params.stop_loss_pct)),
            target_price: entry * (1.0 + sign * params.target_pct),
            state: PositionState::Armed,
            extreme: entry,
            trail_trigger_pct: params.trail_trigger_pct,
            trail_step_pct: params.trail_step_pct,
            last_bar: None,
        }
    }

    pub fn stop_price(&self) -> f64 {
        self.stop.level()
    }

    pub fn target_price(&self) -> f64 {
        self.target_price
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    pub fn is_trailing(&self) -> bool {
        self.state == PositionState::Trailing
    }

    /// Best price seen since entry (highest high for Long, lowest low for Short).
    pub fn extreme(&self) -> f64 {
        self.extreme
    }

    /// Process one fine bar.
    pub fn advance(&mut self, bar: &Bar) -> Step {
        self.last_bar = Some(*bar);

        if self.stop.is_hit(bar.low, bar.high) {
            let reason = if self.is_trailing() {
                ExitReason::TrailingSL
            } else {
                ExitReason::StopLoss
            };
            return Step::Exited(Exit {
                time: bar.timestamp,
                price: self.stop.level(),
                reason,
            });
        }

        let target_hit = match self.direction {
            Direction::Long => bar.high >= self.target_price,
            Direction::Short => bar.low <= self.target_price,
        };
        if target_hit {
            return Step::Exited(Exit {
                time: bar.timestamp,
                price: self.target_price,
                reason: ExitReason::Target,
            });
        }

        let sign = self.direction.sign();
        self.extreme = match self.direction {
            Direction::Long => self.extreme.max(bar.high),
            Direction::Short => self.extreme.min(bar.low),
        };

        if self.state == PositionState::Armed {
            let activation = self.entry_price * (1.0 + sign * self.trail_trigger_pct);
            let activated = match self.direction {
                Direction::Long => self.extreme >= activation,
                Direction::Short => self.extreme <= activation,
            };
            if activated {
                self.state = PositionState::Trailing;
            }
        }

        if self.is_trailing() {
            self.stop
                .apply(self.extreme * (1.0 - sign * self.trail_step_pct));
        }

        Step::Holding
    }

    /// Close at a terminal transition.
    pub fn close(self, exit: Exit) -> TradeFill {
        TradeFill {
            symbol: self.symbol,
            direction: self.direction,
            detected_at: self.detected_at,
            entry_time: self.entry_time,
            entry_price: self.entry_price,
            exit_time: exit.time,
            exit_price: exit.price,
            exit_reason: exit.reason,
        }
    }

    /// Liquidate at the close of the last bar seen.
    ///
    /// A position that never saw a bar closes flat at its entry.
    pub fn square_off(self) -> TradeFill {
        let (time, price) = match self.last_bar {
            Some(bar) => (bar.timestamp, bar.close),
            None => (self.entry_time, self.entry_price),
        };
        self.close(Exit {
            time,
            price,
            reason: ExitReason::EndOfDaySquareOff,
        })
    }

    /// Drive the position over the rest of the session.
    ///
    /// `bars` starts at the fill bar. Exactly one trade comes out.
    pub fn run(mut self, bars: &[Bar]) -> TradeFill {
        for bar in bars {
            if let Step::Exited(exit) = self.advance(bar) {
                return self.close(exit);
            }
        }
        self.square_off()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn bar(m: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: at(11, 0) + Duration::minutes(m),
            open,
            high,
            low,
            close,
            volume: 100.0,
        }
    }

    fn open(direction: Direction, price: f64) -> OpenPosition {
        let intent = TradeIntent {
            symbol: "TEST".into(),
            direction,
            detected_at: at(11, 0),
            trigger_price: price,
        };
        let fill = Fill {
            time: at(11, 1),
            price,
            bar_index: 0,
            gapped: false,
        };
        OpenPosition::open(&intent, &fill, &BracketParams::default())
    }

    #[test]
    fn bracket_levels_on_open() {
        let long = open(Direction::Long, 100.0);
        assert!((long.stop_price() - 99.5).abs() < 1e-9);
        assert!((long.target_price() - 102.0).abs() < 1e-9);
        assert_eq!(long.extreme(), 100.0);
        assert_eq!(long.state(), PositionState::Armed);

        let short = open(Direction::Short, 100.0);
        assert!((short.stop_price() - 100.5).abs() < 1e-9);
        assert!((short.target_price() - 98.0).abs() < 1e-9);
    }

    #[test]
    fn stop_beats_target_in_same_bar() {
        let mut pos = open(Direction::Long, 100.0);
        let step = pos.advance(&bar(1, 100.0, 103.0, 99.0, 101.0));
        match step {
            Step::Exited(exit) => {
                assert_eq!(exit.reason, ExitReason::StopLoss);
                assert!((exit.price - 99.5).abs() < 1e-9);
            }
            Step::Holding => panic!("expected exit"),
        }
    }

    #[test]
    fn long_target_exit() {
        let mut pos = open(Direction::Long, 100.0);
        assert_eq!(pos.advance(&bar(1, 100.0, 100.3, 99.8, 100.2)), Step::Holding);
        match pos.advance(&bar(2, 101.0, 102.5, 100.9, 102.2)) {
            Step::Exited(exit) => {
                assert_eq!(exit.reason, ExitReason::Target);
                assert!((exit.price - 102.0).abs() < 1e-9);
            }
            Step::Holding => panic!("expected exit"),
        }
    }

    #[test]
    fn exit_check_runs_before_trailing_update() {
        // Bar makes a new high that would ratchet the stop above its low,
        // but the exit check uses the stop from before the bar.
        let mut pos = open(Direction::Long, 100.0);
        assert_eq!(pos.advance(&bar(1, 100.0, 100.6, 99.9, 100.5)), Step::Holding);
        assert!(pos.is_trailing());
        let stop_before = pos.stop_price(); // 100.6 * 0.9925
        assert!(stop_before > 99.5);
        assert_eq!(pos.advance(&bar(2, 100.5, 101.5, 99.9, 101.0)), Step::Holding);
        assert!(pos.stop_price() > stop_before);
    }

    #[test]
    fn short_trailing_ratchets_down_and_exits_trailing() {
        let mut pos = open(Direction::Short, 100.0);
        // low 99.4 <= 99.5 activates trailing; stop = min(100.5, 99.4 * 1.0075)
        assert_eq!(pos.advance(&bar(1, 100.0, 100.1, 99.4, 99.6)), Step::Holding);
        assert!(pos.is_trailing());
        let expected = 99.4 * 1.0075;
        assert!((pos.stop_price() - expected).abs() < 1e-9);

        // a rally does not loosen the stop
        match pos.advance(&bar(2, 99.7, 100.2, 99.6, 100.0)) {
            Step::Exited(exit) => {
                assert_eq!(exit.reason, ExitReason::TrailingSL);
                assert!((exit.price - expected).abs() < 1e-9);
            }
            Step::Holding => panic!("expected trailing stop exit"),
        }
    }

    #[test]
    fn trailing_never_reverts() {
        let mut pos = open(Direction::Long, 100.0);
        pos.advance(&bar(1, 100.0, 100.8, 100.0, 100.7));
        assert!(pos.is_trailing());
        pos.advance(&bar(2, 100.7, 100.75, 100.1, 100.2));
        assert!(pos.is_trailing());
    }

    #[test]
    fn run_squares_off_at_last_close() {
        let pos = open(Direction::Long, 100.0);
        let bars = vec![
            bar(1, 100.0, 100.2, 99.8, 100.1),
            bar(2, 100.1, 100.3, 99.9, 100.2),
            bar(3, 100.2, 100.4, 100.0, 100.3),
        ];
        let trade = pos.run(&bars);
        assert_eq!(trade.exit_reason, ExitReason::EndOfDaySquareOff);
        assert_eq!(trade.exit_price, 100.3);
        assert_eq!(trade.exit_time, bars[2].timestamp);
    }

    #[test]
    fn run_on_no_bars_closes_at_entry() {
        let trade = open(Direction::Short, 50.0).run(&[]);
        assert_eq!(trade.exit_reason, ExitReason::EndOfDaySquareOff);
        assert_eq!(trade.exit_price, 50.0);
        assert_eq!(trade.exit_time, trade.entry_time);
    }
}
