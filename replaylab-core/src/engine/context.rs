//! What a strategy may see and touch while handling one bar.

use chrono::NaiveDateTime;
use std::any::Any;
use std::collections::HashMap;
use tracing::warn;

use crate::data::MarketData;
use crate::domain::{Bar, Metadata, Position};
use crate::ledger::Ledger;

/// Per-run scratch storage, one typed slot per namespace.
///
/// Created empty for every run, so nothing carries over between runs or
/// between parameter combinations.
#[derive(Default)]
pub struct ScratchState {
    slots: HashMap<String, Box<dyn Any + Send>>,
}

impl ScratchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot for `namespace`, created with `T::default()` on first use.
    ///
    /// A slot holding some other type is replaced.
    pub fn slot<T: Any + Send + Default>(&mut self, namespace: &str) -> &mut T {
        let slot = self
            .slots
            .entry(namespace.to_string())
            .or_insert_with(|| Box::new(T::default()));
        if !(**slot).is::<T>() {
            warn!(namespace, "scratch slot held a different type, resetting");
            *slot = Box::new(T::default());
        }
        slot.downcast_mut::<T>()
            .expect("scratch slot holds T after reset")
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl std::fmt::Debug for ScratchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScratchState")
            .field("namespaces", &self.slots.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Ledger queries, history and scratch state for the current bar.
///
/// Strategies cannot move cash or touch the trade log; the only mutation on
/// offer is merging metadata into one of their open positions.
pub struct StrategyContext<'a> {
    ledger: &'a mut Ledger,
    market: &'a MarketData,
    scratch: &'a mut ScratchState,
    timestamp: NaiveDateTime,
    bar_index: usize,
}

impl<'a> StrategyContext<'a> {
    pub fn new(
        ledger: &'a mut Ledger,
        market: &'a MarketData,
        scratch: &'a mut ScratchState,
        timestamp: NaiveDateTime,
        bar_index: usize,
    ) -> Self {
        Self {
            ledger,
            market,
            scratch,
            timestamp,
            bar_index,
        }
    }

    /// Current simulated timestamp.
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Zero-based index of the current bar on the reference clock.
    pub fn bar_index(&self) -> usize {
        self.bar_index
    }

    pub fn cash(&self) -> f64 {
        self.ledger.cash()
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.ledger.position(symbol)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.ledger.has_position(symbol)
    }

    pub fn open_positions_count(&self) -> usize {
        self.ledger.open_positions_count()
    }

    /// Merge `update` into the open position's metadata. False if none is open.
    pub fn update_position_metadata(&mut self, symbol: &str, update: Metadata) -> bool {
        self.ledger.update_position_metadata(symbol, update)
    }

    /// Bars for `symbol` up to and including now, optionally only the last
    /// `lookback`. Empty for unknown symbols.
    pub fn history(&self, symbol: &str, lookback: Option<usize>) -> &'a [Bar] {
        let market: &'a MarketData = self.market;
        market
            .series(symbol)
            .map(|s| s.up_to(self.timestamp, lookback))
            .unwrap_or(&[])
    }

    /// Typed scratch slot for `namespace`.
    pub fn scratch<T: Any + Send + Default>(&mut self, namespace: &str) -> &mut T {
        self.scratch.slot(namespace)
    }
}
