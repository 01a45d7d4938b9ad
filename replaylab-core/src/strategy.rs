//! Strategy trait and the per-bar snapshot it receives.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use crate::domain::{Bar, Order};
use crate::engine::StrategyContext;
use crate::params::ParamSet;

/// Bars of every instrument that printed at one timestamp.
///
/// Instruments without a bar at this timestamp are absent, never filled.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub timestamp: NaiveDateTime,
    pub bars: BTreeMap<String, Bar>,
}

impl Snapshot {
    pub fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            bars: BTreeMap::new(),
        }
    }

    pub fn with_bar(mut self, symbol: impl Into<String>, bar: Bar) -> Self {
        self.bars.insert(symbol.into(), bar);
        self
    }

    pub fn get(&self, symbol: &str) -> Option<&Bar> {
        self.bars.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.bars.contains_key(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bar)> {
        self.bars.iter().map(|(s, b)| (s.as_str(), b))
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// A trading rule driven bar by bar.
///
/// `on_bar` sees the ledger through `ctx`, the current snapshot and the
/// parameter combination, and returns intents that are applied in order.
/// Implementations must handle any snapshot, including an empty one.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn on_bar(&self, ctx: &mut StrategyContext<'_>, bars: &Snapshot, params: &ParamSet) -> Vec<Order>;
}

/// A closure lifted into a [`Strategy`].
pub struct FnStrategy<F> {
    name: String,
    f: F,
}

/// Wrap a closure as a named strategy.
pub fn from_fn<F>(name: impl Into<String>, f: F) -> FnStrategy<F>
where
    F: Fn(&mut StrategyContext<'_>, &Snapshot, &ParamSet) -> Vec<Order> + Send + Sync,
{
    FnStrategy {
        name: name.into(),
        f,
    }
}

impl<F> Strategy for FnStrategy<F>
where
    F: Fn(&mut StrategyContext<'_>, &Snapshot, &ParamSet) -> Vec<Order> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_bar(&self, ctx: &mut StrategyContext<'_>, bars: &Snapshot, params: &ParamSet) -> Vec<Order> {
        (self.f)(ctx, bars, params)
    }
}

impl<F> std::fmt::Debug for FnStrategy<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStrategy").field("name", &self.name).finish()
    }
}
