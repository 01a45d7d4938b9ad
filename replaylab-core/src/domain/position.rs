use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::metadata::Metadata;

/// Direction of an open exposure or a completed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One currently-open exposure.
///
/// Only `metadata` changes while the position is open; everything else is
/// fixed at entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub direction: Direction,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub quantity: u64,
    /// Fraction of cash committed at entry; becomes the trade's weight.
    pub allocation: f64,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.direction == Direction::Long
    }

    pub fn is_short(&self) -> bool {
        self.direction == Direction::Short
    }

    /// Capital committed at entry: `entry_price × quantity`.
    pub fn cost_basis(&self) -> f64 {
        self.entry_price * self.quantity as f64
    }

    /// Realized/unrealized P&L if the position were valued at `price`.
    pub fn pnl_at(&self, price: f64) -> f64 {
        let qty = self.quantity as f64;
        match self.direction {
            Direction::Long => (price - self.entry_price) * qty,
            Direction::Short => (self.entry_price - price) * qty,
        }
    }

    /// Signed return relative to entry price if exited at `price`.
    pub fn return_at(&self, price: f64) -> f64 {
        match self.direction {
            Direction::Long => (price - self.entry_price) / self.entry_price,
            Direction::Short => (self.entry_price - price) / self.entry_price,
        }
    }

    /// Mark-to-market value at `price`.
    ///
    /// Shorts are carried as full-notional collateral plus symmetric P&L:
    /// `quantity × (2 × entry − price)`.
    pub fn market_value(&self, price: f64) -> f64 {
        let qty = self.quantity as f64;
        match self.direction {
            Direction::Long => qty * price,
            Direction::Short => qty * (2.0 * self.entry_price - price),
        }
    }
}
