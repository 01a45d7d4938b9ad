//! ReplayLab Core: domain records, ledger, order execution and the
//! bar-by-bar backtest loop.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (bars, order intents, positions, trades)
//! - Equity and position ledger with mark-to-market accounting
//! - Execution of buy/sell/close intents with cash-allocation sizing
//! - Simulation clock driven by the reference instrument's timestamps
//! - Strategy trait, context handle and namespaced scratch state
//! - Data provider seam with in-memory, CSV and synthetic sources

pub mod data;
pub mod domain;
pub mod engine;
pub mod ledger;
pub mod params;
pub mod rng;
pub mod strategies;
pub mod strategy;

pub use engine::{Backtester, EngineConfig, EngineError, RunResult};
pub use params::{ParamError, ParamSet, ParamSetExt, ParamValue};
pub use strategy::{from_fn, Snapshot, Strategy};
