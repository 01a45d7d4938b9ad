//! Reference strategies used by the CLI, benches and tests.

pub mod buy_and_hold;
pub mod ma_cross;

pub use buy_and_hold::BuyAndHold;
pub use ma_cross::MovingAverageCross;

use crate::strategy::Strategy;

/// Look up a reference strategy by name.
pub fn by_name(name: &str) -> Option<Box<dyn Strategy>> {
    match name {
        "buy_and_hold" => Some(Box::new(BuyAndHold)),
        "ma_cross" | "moving_average_cross" => Some(Box::new(MovingAverageCross)),
        _ => None,
    }
}
