//! Moving average crossover on closes.
//!
//! Golden cross (fast SMA crosses above slow) enters long; death cross exits,
//! and with `allow_short` also enters short. An open short is covered on the
//! next golden cross.

use crate::domain::{Bar, Direction, Order};
use crate::engine::StrategyContext;
use crate::params::{ParamSet, ParamSetExt};
use crate::strategy::{Snapshot, Strategy};

/// Params: `fast` (default 10), `slow` (default 30), `allocation`
/// (default 1.0), `allow_short` (default false). `fast >= slow` trades
/// nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct MovingAverageCross;

fn sma(bars: &[Bar]) -> f64 {
    bars.iter().map(|b| b.close).sum::<f64>() / bars.len() as f64
}

impl Strategy for MovingAverageCross {
    fn name(&self) -> &str {
        "ma_cross"
    }

    fn on_bar(&self, ctx: &mut StrategyContext<'_>, bars: &Snapshot, params: &ParamSet) -> Vec<Order> {
        let fast = params.int("fast").unwrap_or(10);
        let slow = params.int("slow").unwrap_or(30);
        let allocation = params.float("allocation").unwrap_or(1.0);
        let allow_short = params.flag("allow_short").unwrap_or(false);
        if fast < 1 || fast >= slow {
            return Vec::new();
        }
        let (fast, slow) = (fast as usize, slow as usize);

        let mut orders = Vec::new();
        for (symbol, _) in bars.iter() {
            let history = ctx.history(symbol, Some(slow + 1));
            if history.len() < slow + 1 {
                continue;
            }
            let (prev, cur) = (&history[..slow], &history[1..]);
            let fast_prev = sma(&prev[slow - fast..]);
            let slow_prev = sma(prev);
            let fast_cur = sma(&cur[slow - fast..]);
            let slow_cur = sma(cur);

            let golden = fast_cur > slow_cur && fast_prev <= slow_prev;
            let death = fast_cur < slow_cur && fast_prev >= slow_prev;
            let held = ctx.position(symbol).map(|p| p.direction);

            if golden {
                if held == Some(Direction::Short) {
                    orders.push(Order::close(symbol).with_meta("exit_reason", "golden_cross"));
                }
                if held != Some(Direction::Long) {
                    orders.push(
                        Order::buy(symbol, allocation)
                            .with_meta("fast_sma", fast_cur)
                            .with_meta("slow_sma", slow_cur),
                    );
                }
            } else if death {
                if held == Some(Direction::Long) {
                    orders.push(Order::close(symbol).with_meta("exit_reason", "death_cross"));
                }
                if allow_short && held != Some(Direction::Short) {
                    orders.push(
                        Order::sell(symbol, allocation)
                            .with_meta("fast_sma", fast_cur)
                            .with_meta("slow_sma", slow_cur),
                    );
                }
            }
        }
        orders
    }
}
