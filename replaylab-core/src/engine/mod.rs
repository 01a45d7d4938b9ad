//! Backtesting engine: order execution, strategy context and the bar-by-bar
//! event loop.
//!
//! Per bar the loop snapshots the universe, calls the strategy, applies its
//! intents sequentially through [`execution::execute`], then marks the ledger
//! to market.

pub mod context;
pub mod event_loop;
pub mod execution;
pub mod state;

pub use context::{ScratchState, StrategyContext};
pub use event_loop::{Backtester, Session};
pub use execution::{execute, Execution, IgnoreReason, ALLOCATION_KEY};
pub use state::{EngineConfig, EngineError, RunDiagnostics, RunResult, RunState};
