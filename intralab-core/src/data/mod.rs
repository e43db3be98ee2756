//! Session data: loaded rows grouped into per-date sessions, session
//! validation, and a deterministic synthetic generator.

pub mod session;
pub mod synthetic;

pub use session::{group_sessions, Session, SessionError};
pub use synthetic::{synthetic_sessions, SyntheticParams};

use serde::{Deserialize, Serialize};

use crate::domain::Bar;

/// One loaded row: a fine bar tagged with its symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub symbol: String,
    pub bar: Bar,
}
