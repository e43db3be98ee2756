//! Domain types for IntraLab

pub mod bar;
pub mod direction;
pub mod intent;
pub mod trade;

pub use bar::Bar;
pub use direction::Direction;
pub use intent::TradeIntent;
pub use trade::{ClosedTrade, ExitReason, TradeFill};

/// Symbol type alias
pub type Symbol = String;
