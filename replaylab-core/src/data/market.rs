//! Time-indexed bar tables for a universe of instruments.
//!
//! Each instrument keeps its own ascending series. No alignment or
//! forward-fill happens here: an instrument without a bar at some timestamp
//! simply has no entry there, and the loop leaves it out of that snapshot.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};

use super::provider::{DataError, DataProvider, Resolution};
use crate::domain::Bar;

/// Ascending bar series for one instrument with O(1) timestamp lookup.
#[derive(Debug, Clone, Default)]
pub struct BarSeries {
    bars: Vec<Bar>,
    index: HashMap<NaiveDateTime, usize>,
}

impl BarSeries {
    /// Build a series, sorting by timestamp. Duplicate timestamps are rejected.
    pub fn new(mut bars: Vec<Bar>) -> Result<Self, DataError> {
        bars.sort_by_key(|b| b.timestamp);
        let mut index = HashMap::with_capacity(bars.len());
        for (i, bar) in bars.iter().enumerate() {
            if index.insert(bar.timestamp, i).is_some() {
                return Err(DataError::Validation(format!(
                    "duplicate bar timestamp {}",
                    bar.timestamp
                )));
            }
        }
        Ok(Self { bars, index })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Bar stamped exactly at `ts`, if any.
    pub fn at(&self, ts: NaiveDateTime) -> Option<&Bar> {
        self.index.get(&ts).map(|&i| &self.bars[i])
    }

    /// Bars up to and including `ts`, optionally bounded to the last `lookback`.
    pub fn up_to(&self, ts: NaiveDateTime, lookback: Option<usize>) -> &[Bar] {
        let end = match self.index.get(&ts) {
            Some(&i) => i + 1,
            None => self.bars.partition_point(|b| b.timestamp <= ts),
        };
        let start = match lookback {
            Some(n) => end.saturating_sub(n),
            None => 0,
        };
        &self.bars[start..end]
    }

    /// Bars with `start <= timestamp < end`.
    pub fn between(&self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        let bars: Vec<Bar> = self
            .bars
            .iter()
            .filter(|b| b.timestamp >= start && b.timestamp < end)
            .copied()
            .collect();
        let index = bars
            .iter()
            .enumerate()
            .map(|(i, b)| (b.timestamp, i))
            .collect();
        Self { bars, index }
    }
}

/// Bar tables for every instrument in a universe.
///
/// The first symbol inserted is the reference instrument whose timestamps
/// drive the simulation clock.
#[derive(Debug, Clone, Default)]
pub struct MarketData {
    symbols: Vec<String>,
    series: BTreeMap<String, BarSeries>,
}

impl MarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) an instrument's table.
    pub fn insert(&mut self, symbol: impl Into<String>, bars: Vec<Bar>) -> Result<(), DataError> {
        let symbol = symbol.into();
        let series = BarSeries::new(bars)?;
        if !self.series.contains_key(&symbol) {
            self.symbols.push(symbol.clone());
        }
        self.series.insert(symbol, series);
        Ok(())
    }

    /// Builder form of [`MarketData::insert`].
    pub fn with_symbol(mut self, symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, DataError> {
        self.insert(symbol, bars)?;
        Ok(self)
    }

    /// Load every symbol from a provider. The first symbol becomes the reference.
    pub fn load(
        provider: &dyn DataProvider,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> Result<Self, DataError> {
        let mut market = Self::new();
        for symbol in symbols {
            let bars = provider.history(symbol, start, end, resolution)?;
            tracing::debug!(
                provider = provider.name(),
                symbol = %symbol,
                bars = bars.len(),
                "loaded history"
            );
            market.insert(symbol.clone(), bars)?;
        }
        Ok(market)
    }

    /// Symbols in insertion order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.series.contains_key(symbol)
    }

    pub fn series(&self, symbol: &str) -> Option<&BarSeries> {
        self.series.get(symbol)
    }

    pub fn reference_symbol(&self) -> Option<&str> {
        self.symbols.first().map(String::as_str)
    }

    /// Timestamps of the reference instrument, ascending.
    pub fn clock(&self) -> Vec<NaiveDateTime> {
        self.reference_symbol()
            .and_then(|s| self.series.get(s))
            .map(|series| series.bars().iter().map(|b| b.timestamp).collect())
            .unwrap_or_default()
    }

    /// Restrict to `symbols` (in that order) and `[start, end)`.
    ///
    /// Fails with `SymbolNotFound` if any requested symbol has no table.
    pub fn select(
        &self,
        symbols: &[String],
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Self, DataError> {
        let mut out = Self::new();
        for symbol in symbols {
            let series = self
                .series
                .get(symbol)
                .ok_or_else(|| DataError::SymbolNotFound { symbol: symbol.clone() })?;
            if !out.series.contains_key(symbol) {
                out.symbols.push(symbol.clone());
            }
            out.series.insert(symbol.clone(), series.between(start, end));
        }
        Ok(out)
    }
}
