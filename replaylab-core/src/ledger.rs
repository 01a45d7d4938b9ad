//! Equity and position ledger.
//!
//! The ledger owns cash, the open-position map, the append-only trade log and
//! the equity series for one run. The accounting identity holds at every
//! sample: `equity == cash + sum(position market values)`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::domain::{Bar, Metadata, Position, Trade};

/// One equity sample, taken after a bar's intents have been applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    initial_cash: f64,
    cash: f64,
    positions: BTreeMap<String, Position>,
    trades: Vec<Trade>,
    equity_curve: Vec<EquityPoint>,
    /// Last observed close per symbol, used to mark positions on bars where
    /// their instrument has no data.
    last_marks: HashMap<String, f64>,
}

impl Ledger {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            initial_cash,
            cash: initial_cash,
            positions: BTreeMap::new(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
            last_marks: HashMap::new(),
        }
    }

    // ── Queries ──

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn open_positions_count(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    /// Sum of realized P&L over closed trades.
    pub fn realized_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.pnl).sum()
    }

    // ── Mutations ──

    /// Merge `update` into an open position's metadata.
    ///
    /// Returns false (and changes nothing) when no position is open.
    pub fn update_position_metadata(&mut self, symbol: &str, update: Metadata) -> bool {
        match self.positions.get_mut(symbol) {
            Some(position) => {
                position.metadata.extend(update);
                true
            }
            None => false,
        }
    }

    /// Debit the cost basis and store the position.
    ///
    /// Callers guarantee no position is open for the symbol.
    pub(crate) fn open(&mut self, position: Position) {
        debug_assert!(!self.positions.contains_key(&position.symbol));
        self.cash -= position.cost_basis();
        self.positions.insert(position.symbol.clone(), position);
    }

    /// Remove the open position, credit `entry × qty + pnl` and append the trade.
    pub(crate) fn close(
        &mut self,
        symbol: &str,
        exit_time: NaiveDateTime,
        exit_price: f64,
        exit_metadata: Metadata,
    ) -> Option<&Trade> {
        let position = self.positions.remove(symbol)?;
        let trade = Trade::from_close(position, exit_time, exit_price, exit_metadata);
        self.cash += trade.entry_price * trade.quantity as f64 + trade.pnl;
        self.trades.push(trade);
        self.trades.last()
    }

    // ── Marking ──

    /// Price used to value `position`: this bar's close, else the last mark,
    /// else the entry price.
    fn mark_for(&self, position: &Position, bars: &BTreeMap<String, Bar>) -> f64 {
        bars.get(&position.symbol)
            .map(|b| b.close)
            .or_else(|| self.last_marks.get(&position.symbol).copied())
            .unwrap_or(position.entry_price)
    }

    /// Total equity against a snapshot without recording anything.
    pub fn equity(&self, bars: &BTreeMap<String, Bar>) -> f64 {
        let position_value: f64 = self
            .positions
            .values()
            .map(|p| p.market_value(self.mark_for(p, bars)))
            .sum();
        self.cash + position_value
    }

    /// Value the book against `bars`, remember their closes and append one
    /// equity sample at `timestamp`.
    pub fn mark_to_market(&mut self, timestamp: NaiveDateTime, bars: &BTreeMap<String, Bar>) -> f64 {
        let equity = self.equity(bars);
        for (symbol, bar) in bars {
            self.last_marks.insert(symbol.clone(), bar.close);
        }
        self.equity_curve.push(EquityPoint { timestamp, equity });
        equity
    }

    /// Final equity sample, or initial cash if nothing was recorded.
    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.initial_cash)
    }

    pub(crate) fn into_parts(self) -> LedgerParts {
        LedgerParts {
            cash: self.cash,
            open_positions: self.positions.into_values().collect(),
            trades: self.trades,
            equity_curve: self.equity_curve,
        }
    }
}

/// Owned ledger contents handed to the run result.
pub(crate) struct LedgerParts {
    pub cash: f64,
    pub open_positions: Vec<Position>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}
