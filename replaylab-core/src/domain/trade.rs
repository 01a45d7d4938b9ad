//! Trade: a completed round trip, appended once when a position closes.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::metadata::Metadata;
use super::position::{Direction, Position};

/// A complete round-trip trade record: entry to exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    // ── Identification ──
    pub symbol: String,
    pub direction: Direction,

    // ── Entry ──
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,

    // ── Size ──
    pub quantity: u64,

    // ── Outcome ──
    /// Realized P&L in currency units.
    pub pnl: f64,
    /// Signed return relative to entry price.
    pub return_pct: f64,
    /// Fraction of cash committed at entry, used for weighted statistics.
    pub weight: f64,

    #[serde(default)]
    pub metadata: Metadata,
}

impl Trade {
    /// Close `position` at `exit_price`, producing the trade record.
    ///
    /// `exit_metadata` entries are merged over the position's metadata.
    pub fn from_close(
        position: Position,
        exit_time: NaiveDateTime,
        exit_price: f64,
        exit_metadata: Metadata,
    ) -> Self {
        let pnl = position.pnl_at(exit_price);
        let return_pct = position.return_at(exit_price);
        let mut metadata = position.metadata;
        metadata.extend(exit_metadata);

        Self {
            symbol: position.symbol,
            direction: position.direction,
            entry_time: position.entry_time,
            entry_price: position.entry_price,
            exit_time,
            exit_price,
            quantity: position.quantity,
            pnl,
            return_pct,
            weight: position.allocation,
            metadata,
        }
    }

    pub fn is_winner(&self) -> bool {
        self.return_pct > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.return_pct < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn open_long() -> Position {
        let mut metadata = Metadata::new();
        metadata.insert("high_water_mark".into(), json!(101.0));
        Position {
            symbol: "SPY".into(),
            direction: Direction::Long,
            entry_time: ts(9, 45),
            entry_price: 100.0,
            quantity: 100,
            allocation: 1.0,
            metadata,
        }
    }

    #[test]
    fn from_close_computes_pnl_and_return() {
        let trade = Trade::from_close(open_long(), ts(15, 45), 110.0, Metadata::new());
        assert_eq!(trade.pnl, 1_000.0);
        assert!((trade.return_pct - 0.10).abs() < 1e-12);
        assert_eq!(trade.weight, 1.0);
        assert!(trade.is_winner());
    }

    #[test]
    fn exit_metadata_merges_over_position_metadata() {
        let mut exit = Metadata::new();
        exit.insert("exit_reason".into(), json!("time_exit"));
        let trade = Trade::from_close(open_long(), ts(15, 45), 99.0, exit);
        assert_eq!(trade.metadata["high_water_mark"], json!(101.0));
        assert_eq!(trade.metadata["exit_reason"], json!("time_exit"));
        assert!(trade.is_loser());
    }

    #[test]
    fn trade_serialization_roundtrip() {
        let trade = Trade::from_close(open_long(), ts(15, 45), 110.0, Metadata::new());
        let json = serde_json::to_string(&trade).unwrap();
        let deser: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, deser);
    }
}
