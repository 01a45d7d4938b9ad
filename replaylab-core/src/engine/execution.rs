//! Order execution: turns one intent into at most one ledger mutation.
//!
//! Entries size as `floor(cash × allocation / price)` against current cash
//! and fill at the override price or the bar close. Anything that cannot be
//! applied is ignored with a reason; ignored intents never touch the ledger.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Bar, Direction, Order, OrderAction, Position};
use crate::ledger::Ledger;

/// Position metadata key holding the entry's cash allocation.
pub const ALLOCATION_KEY: &str = "cash_allocation";

/// Why an intent was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// Entry while a position is already open for the instrument.
    PositionOpen,
    /// Close with nothing open.
    NoPosition,
    /// Allocation outside `(0, 1]`.
    InvalidAllocation,
    /// Fill price non-positive or non-finite.
    InvalidPrice,
    /// No bar at this timestamp and no override price.
    NoPrice,
    /// Allocation too small to buy one unit.
    ZeroQuantity,
}

impl IgnoreReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PositionOpen => "position_open",
            Self::NoPosition => "no_position",
            Self::InvalidAllocation => "invalid_allocation",
            Self::InvalidPrice => "invalid_price",
            Self::NoPrice => "no_price",
            Self::ZeroQuantity => "zero_quantity",
        }
    }
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of applying one intent.
#[derive(Debug, Clone, PartialEq)]
pub enum Execution {
    Opened {
        symbol: String,
        direction: Direction,
        quantity: u64,
        price: f64,
    },
    Closed {
        symbol: String,
        price: f64,
        pnl: f64,
    },
    Ignored(IgnoreReason),
}

impl Execution {
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored(_))
    }
}

fn fill_price(order: &Order, bar: Option<&Bar>) -> Result<f64, IgnoreReason> {
    let price = match (order.price, bar) {
        (Some(p), _) => p,
        (None, Some(bar)) => bar.close,
        (None, None) => return Err(IgnoreReason::NoPrice),
    };
    if !price.is_finite() || price <= 0.0 {
        return Err(IgnoreReason::InvalidPrice);
    }
    Ok(price)
}

/// Apply `order` to `ledger` at `timestamp`.
///
/// `bar` is the instrument's bar at this timestamp, if it has one.
pub fn execute(
    ledger: &mut Ledger,
    order: Order,
    bar: Option<&Bar>,
    timestamp: NaiveDateTime,
) -> Execution {
    let outcome = match order.action {
        OrderAction::Buy { cash_allocation } => {
            open(ledger, order, Direction::Long, cash_allocation, bar, timestamp)
        }
        OrderAction::Sell { cash_allocation } => {
            open(ledger, order, Direction::Short, cash_allocation, bar, timestamp)
        }
        OrderAction::Close => close(ledger, order, bar, timestamp),
    };
    if let Execution::Ignored(reason) = &outcome {
        debug!(%timestamp, %reason, "intent ignored");
    }
    outcome
}

fn open(
    ledger: &mut Ledger,
    order: Order,
    direction: Direction,
    allocation: f64,
    bar: Option<&Bar>,
    timestamp: NaiveDateTime,
) -> Execution {
    if ledger.has_position(&order.symbol) {
        return Execution::Ignored(IgnoreReason::PositionOpen);
    }
    if !(allocation > 0.0 && allocation <= 1.0) {
        return Execution::Ignored(IgnoreReason::InvalidAllocation);
    }
    let price = match fill_price(&order, bar) {
        Ok(p) => p,
        Err(reason) => return Execution::Ignored(reason),
    };

    let spend = ledger.cash() * allocation;
    let quantity = (spend / price).floor();
    if !(quantity >= 1.0) {
        return Execution::Ignored(IgnoreReason::ZeroQuantity);
    }
    let quantity = quantity as u64;

    let symbol = order.symbol;
    let mut metadata = order.metadata;
    metadata.insert(ALLOCATION_KEY.to_string(), allocation.into());
    ledger.open(Position {
        symbol: symbol.clone(),
        direction,
        entry_time: timestamp,
        entry_price: price,
        quantity,
        allocation,
        metadata,
    });
    debug!(%symbol, %direction, quantity, price, "opened position");
    Execution::Opened {
        symbol,
        direction,
        quantity,
        price,
    }
}

fn close(
    ledger: &mut Ledger,
    order: Order,
    bar: Option<&Bar>,
    timestamp: NaiveDateTime,
) -> Execution {
    if !ledger.has_position(&order.symbol) {
        return Execution::Ignored(IgnoreReason::NoPosition);
    }
    let price = match fill_price(&order, bar) {
        Ok(p) => p,
        Err(reason) => return Execution::Ignored(reason),
    };

    match ledger.close(&order.symbol, timestamp, price, order.metadata) {
        Some(trade) => {
            let pnl = trade.pnl;
            debug!(symbol = %order.symbol, price, pnl, "closed position");
            Execution::Closed {
                symbol: order.symbol,
                price,
                pnl,
            }
        }
        None => Execution::Ignored(IgnoreReason::NoPosition),
    }
}
