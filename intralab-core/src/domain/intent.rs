use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Direction;

/// A directional entry intent produced by the signal detector.
///
/// Consumed by the fill simulator in the same evaluation step; never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub symbol: String,
    pub direction: Direction,
    /// Timestamp of the coarse bar that produced the intent.
    pub detected_at: NaiveDateTime,
    /// Stop-entry level: price must trade through it for the order to fill.
    pub trigger_price: f64,
}
