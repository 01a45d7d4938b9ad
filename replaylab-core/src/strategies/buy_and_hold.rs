//! Buy every instrument on its first bar and hold to the end.

use std::collections::HashSet;

use crate::domain::Order;
use crate::engine::StrategyContext;
use crate::params::{ParamSet, ParamSetExt};
use crate::strategy::{Snapshot, Strategy};

/// Enters each instrument once, the first time it prints.
///
/// Params: `allocation` (fraction of current cash per entry, default 1.0).
#[derive(Debug, Clone, Copy, Default)]
pub struct BuyAndHold;

impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn on_bar(&self, ctx: &mut StrategyContext<'_>, bars: &Snapshot, params: &ParamSet) -> Vec<Order> {
        let allocation = params.float("allocation").unwrap_or(1.0);
        let mut orders = Vec::new();
        for (symbol, _) in bars.iter() {
            if ctx.has_position(symbol) {
                continue;
            }
            let attempted = ctx.scratch::<HashSet<String>>("buy_and_hold.attempted");
            if attempted.insert(symbol.to_string()) {
                orders.push(Order::buy(symbol, allocation));
            }
        }
        orders
    }
}
