/// Ratchet invariant enforcement
///
/// **Core Rule:** Stops may tighten, never loosen.
use crate::domain::Direction;

/// Stop level that can only move in the position's favor:
/// - Long positions: stop can only rise
/// - Short positions: stop can only fall
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatchetState {
    level: f64,
    direction: Direction,
}

impl RatchetState {
    pub fn new(direction: Direction, initial_level: f64) -> Self {
        Self {
            level: initial_level,
            direction,
        }
    }

    /// Apply the ratchet to a proposed stop level and return the new level.
    ///
    /// # Example
    /// ```
    /// use intralab_core::domain::Direction;
    /// use intralab_core::engine::RatchetState;
    ///
    /// let mut ratchet = RatchetState::new(Direction::Long, 95.0);
    /// assert_eq!(ratchet.apply(100.0), 100.0); // tightening allowed
    /// assert_eq!(ratchet.apply(90.0), 100.0); // loosening blocked
    /// ```
    pub fn apply(&mut self, proposed: f64) -> f64 {
        self.level = match self.direction {
            Direction::Long => self.level.max(proposed),
            Direction::Short => self.level.min(proposed),
        };
        self.level
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    /// True if a bar trading between `low` and `high` reaches the stop.
    pub fn is_hit(&self, low: f64, high: f64) -> bool {
        match self.direction {
            Direction::Long => low <= self.level,
            Direction::Short => high >= self.level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_tightening_allowed() {
        let mut ratchet = RatchetState::new(Direction::Long, 95.0);
        assert_eq!(ratchet.apply(100.0), 100.0);
        assert_eq!(ratchet.level(), 100.0);
    }

    #[test]
    fn long_loosening_blocked() {
        let mut ratchet = RatchetState::new(Direction::Long, 100.0);
        assert_eq!(ratchet.apply(90.0), 100.0);
    }

    #[test]
    fn short_tightening_allowed() {
        let mut ratchet = RatchetState::new(Direction::Short, 105.0);
        assert_eq!(ratchet.apply(100.0), 100.0);
    }

    #[test]
    fn short_loosening_blocked() {
        let mut ratchet = RatchetState::new(Direction::Short, 100.0);
        assert_eq!(ratchet.apply(110.0), 100.0);
    }

    #[test]
    fn nan_proposal_keeps_level() {
        // f64::max/min ignore a NaN operand
        let mut ratchet = RatchetState::new(Direction::Long, 100.0);
        assert_eq!(ratchet.apply(f64::NAN), 100.0);
    }

    #[test]
    fn hit_detection_per_side() {
        let long = RatchetState::new(Direction::Long, 99.0);
        assert!(long.is_hit(99.0, 101.0));
        assert!(!long.is_hit(99.5, 101.0));

        let short = RatchetState::new(Direction::Short, 101.0);
        assert!(short.is_hit(99.0, 101.0));
        assert!(!short.is_hit(99.0, 100.5));
    }
}
