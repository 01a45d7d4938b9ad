//! Engine configuration, errors, run state and run result types.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::data::{DataError, Resolution};
use crate::domain::{Position, Trade};
use crate::ledger::EquityPoint;

use super::execution::{Execution, IgnoreReason};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown instrument: {symbol}")]
    UnknownInstrument { symbol: String },

    #[error("invalid backtest window: start {start} is not before end {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("initial cash must be positive and finite, got {0}")]
    InvalidInitialCash(f64),

    #[error("universe is empty")]
    EmptyUniverse,

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Universe; the first symbol is the reference instrument.
    pub symbols: Vec<String>,
    /// Inclusive first date.
    pub start_date: NaiveDate,
    /// Exclusive last date.
    pub end_date: NaiveDate,
    pub initial_cash: f64,
    #[serde(default)]
    pub resolution: Resolution,
}

impl EngineConfig {
    pub fn new(
        symbols: Vec<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        initial_cash: f64,
    ) -> Self {
        Self {
            symbols,
            start_date,
            end_date,
            initial_cash,
            resolution: Resolution::default(),
        }
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.symbols.is_empty() {
            return Err(EngineError::EmptyUniverse);
        }
        if self.start_date >= self.end_date {
            return Err(EngineError::InvalidWindow {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if !self.initial_cash.is_finite() || self.initial_cash <= 0.0 {
            return Err(EngineError::InvalidInitialCash(self.initial_cash));
        }
        Ok(())
    }

    pub fn reference_symbol(&self) -> Option<&str> {
        self.symbols.first().map(String::as_str)
    }

    /// `[start_date 00:00, end_date 00:00)` as timestamps.
    pub fn window(&self) -> (NaiveDateTime, NaiveDateTime) {
        (
            self.start_date.and_time(NaiveTime::MIN),
            self.end_date.and_time(NaiveTime::MIN),
        )
    }
}

/// Simulation clock lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Running,
    Complete,
}

/// Intent outcome counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub intents: usize,
    pub opened: usize,
    pub closed: usize,
    pub ignored: BTreeMap<IgnoreReason, usize>,
}

impl RunDiagnostics {
    pub fn record(&mut self, outcome: &Execution) {
        self.intents += 1;
        match outcome {
            Execution::Opened { .. } => self.opened += 1,
            Execution::Closed { .. } => self.closed += 1,
            Execution::Ignored(reason) => *self.ignored.entry(*reason).or_insert(0) += 1,
        }
    }

    pub fn ignored_total(&self) -> usize {
        self.ignored.values().sum()
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub strategy: String,
    pub initial_cash: f64,
    pub final_cash: f64,
    pub final_equity: f64,
    pub bars_processed: usize,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    /// Positions still open when the clock ran out; they are not force-closed.
    pub open_positions: Vec<Position>,
    pub diagnostics: RunDiagnostics,
}

impl RunResult {
    pub fn total_return(&self) -> f64 {
        (self.final_equity - self.initial_cash) / self.initial_cash
    }

    pub fn equity_values(&self) -> Vec<f64> {
        self.equity_curve.iter().map(|p| p.equity).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn validate_rejects_bad_configs() {
        let ok = EngineConfig::new(vec!["SPY".into()], d(2), d(5), 10_000.0);
        assert!(ok.validate().is_ok());

        let empty = EngineConfig::new(vec![], d(2), d(5), 10_000.0);
        assert!(matches!(empty.validate(), Err(EngineError::EmptyUniverse)));

        let inverted = EngineConfig::new(vec!["SPY".into()], d(5), d(5), 10_000.0);
        assert!(matches!(inverted.validate(), Err(EngineError::InvalidWindow { .. })));

        let broke = EngineConfig::new(vec!["SPY".into()], d(2), d(5), 0.0);
        assert!(matches!(broke.validate(), Err(EngineError::InvalidInitialCash(_))));
    }

    #[test]
    fn diagnostics_count_by_reason() {
        let mut diag = RunDiagnostics::default();
        diag.record(&Execution::Ignored(IgnoreReason::ZeroQuantity));
        diag.record(&Execution::Ignored(IgnoreReason::ZeroQuantity));
        diag.record(&Execution::Ignored(IgnoreReason::NoPosition));
        assert_eq!(diag.intents, 3);
        assert_eq!(diag.ignored_total(), 3);
        assert_eq!(diag.ignored[&IgnoreReason::ZeroQuantity], 2);
    }
}
