//! IntraLab Core: intraday trade simulation engine.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (bars, intents, unsized fills, closed trades)
//! - Session grouping, validation and synthetic sessions
//! - Indicator feed: resampling, EMA, RSI, as-of trend merge
//! - Universe selection by opening turnover
//! - Engine: signal detection, fill simulation with the gap rule, bracket
//!   position state machine with a ratcheting trailing stop, capital ledger
//!
//! Everything here is pure computation over in-memory bars. File I/O,
//! parallel day runs and reporting live in `intralab-runner`.

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod universe;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed across rayon workers are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::TradeIntent>();
        require_sync::<domain::TradeIntent>();
        require_send::<domain::TradeFill>();
        require_sync::<domain::TradeFill>();
        require_send::<domain::ClosedTrade>();
        require_sync::<domain::ClosedTrade>();

        // Data
        require_send::<data::Session>();
        require_sync::<data::Session>();

        // Indicators
        require_send::<indicators::IndicatorFeed>();
        require_sync::<indicators::IndicatorFeed>();

        // Engine types
        require_send::<engine::EngineConfig>();
        require_sync::<engine::EngineConfig>();
        require_send::<engine::OpenPosition>();
        require_sync::<engine::OpenPosition>();
        require_send::<engine::SymbolRun>();
        require_sync::<engine::SymbolRun>();
        require_send::<engine::DaySettlement>();
        require_sync::<engine::DaySettlement>();
        require_send::<engine::LedgerError>();
        require_sync::<engine::LedgerError>();
    }

    /// Architecture contract: the detector sees one coarse bar, its row and
    /// the fine bars. It takes no position or capital state, so it cannot
    /// condition on anything the ledger knows.
    #[test]
    fn detector_has_no_capital_parameter() {
        fn _check_signature(
            coarse: &domain::Bar,
            row: &indicators::IndicatorRow,
            fine: &[domain::Bar],
            rules: &engine::SignalRules,
        ) -> engine::Detection {
            engine::detect("X", coarse, row, fine, rules)
        }
    }
}
