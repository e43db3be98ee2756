//! Trade simulation engine.
//!
//! Per symbol and session:
//! coarse bar → [`signal::detect`] → [`fill::simulate_fill`] →
//! [`position::OpenPosition`] driven to exit → [`TradeFill`].
//!
//! Per session, after every symbol is done: [`ledger::settle_day`] sizes the
//! fills against compounding capital in entry-time order.
//!
//! [`TradeFill`]: crate::domain::TradeFill

pub mod config;
pub mod fill;
pub mod ledger;
pub mod position;
pub mod ratchet;
pub mod session;
pub mod signal;

pub use config::EngineConfig;
pub use fill::{simulate_fill, Fill, FillOutcome};
pub use ledger::{settle_day, size_quantity, CapitalState, DaySettlement, LedgerError, SizingRules};
pub use position::{BracketParams, Exit, OpenPosition, PositionState, Step};
pub use ratchet::RatchetState;
pub use session::{simulate_symbol, SignalStats, SymbolRun};
pub use signal::{detect, entry_direction, Detection, SignalRules, Suppressed};
