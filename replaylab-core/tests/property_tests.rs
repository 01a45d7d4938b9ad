//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Cash conservation: with everything closed, cash = initial + realized P&L
//! 2. At most one position per instrument: trades on a symbol never overlap
//! 3. Equity continuity: one sample per bar, strictly increasing timestamps
//! 4. Ignored intents never move cash

use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;

use replaylab_core::data::MarketData;
use replaylab_core::domain::{Bar, Order};
use replaylab_core::engine::{Backtester, EngineConfig};
use replaylab_core::{from_fn, ParamSet};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_prices(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((5.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0), len)
}

/// (kind, allocation): 0 = nothing, 1 = buy, 2 = sell, 3 = close.
fn arb_intents(len: usize) -> impl Strategy<Value = Vec<(u8, f64)>> {
    prop::collection::vec((0u8..4, 0.05..1.0_f64), len)
}

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

fn bars_from(prices: &[f64]) -> Vec<Bar> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &p)| Bar::new(t0() + Duration::minutes(i as i64), p, p, p, p))
        .collect()
}

fn config(symbols: &[&str]) -> EngineConfig {
    EngineConfig::new(
        symbols.iter().map(|s| s.to_string()).collect(),
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        25_000.0,
    )
}

fn intent(symbol: &str, kind: u8, allocation: f64) -> Option<Order> {
    match kind {
        1 => Some(Order::buy(symbol, allocation)),
        2 => Some(Order::sell(symbol, allocation)),
        3 => Some(Order::close(symbol)),
        _ => None,
    }
}

// ── 1. Cash conservation ─────────────────────────────────────────────

proptest! {
    #[test]
    fn cash_is_conserved_when_flat(
        (prices, intents) in arb_prices(2..60).prop_flat_map(|p| {
            let n = p.len();
            (Just(p), arb_intents(n))
        })
    ) {
        let market = MarketData::new().with_symbol("SPY", bars_from(&prices)).unwrap();
        let bt = Backtester::new(config(&["SPY"]), &market).unwrap();
        let last = prices.len() - 1;
        let strategy = from_fn("random", move |ctx, _, _| {
            let i = ctx.bar_index();
            if i == last {
                return vec![Order::close("SPY")];
            }
            let (kind, alloc) = intents[i];
            intent("SPY", kind, alloc).into_iter().collect()
        });

        let result = bt.run(&strategy, &ParamSet::new()).unwrap();
        prop_assert!(result.open_positions.is_empty());
        let realized: f64 = result.trades.iter().map(|t| t.pnl).sum();
        let expected = result.initial_cash + realized;
        prop_assert!((result.final_cash - expected).abs() <= 1e-6 * expected.abs().max(1.0));
        prop_assert!((result.final_equity - result.final_cash).abs() <= 1e-6 * expected.abs().max(1.0));
    }
}

// ── 2. At most one position per instrument ───────────────────────────

proptest! {
    #[test]
    fn trades_on_a_symbol_never_overlap(
        (spy, qqq, intents) in (2usize..40).prop_flat_map(|n| {
            (arb_prices(n..n + 1), arb_prices(n..n + 1), arb_intents(n * 2))
        })
    ) {
        let market = MarketData::new()
            .with_symbol("SPY", bars_from(&spy))
            .unwrap()
            .with_symbol("QQQ", bars_from(&qqq))
            .unwrap();
        let bt = Backtester::new(config(&["SPY", "QQQ"]), &market).unwrap();
        let strategy = from_fn("random2", move |ctx, _, _| {
            let i = ctx.bar_index();
            let mut orders = Vec::new();
            for (k, symbol) in ["SPY", "QQQ"].iter().enumerate() {
                let (kind, alloc) = intents[i * 2 + k];
                orders.extend(intent(symbol, kind, alloc));
            }
            assert!(ctx.open_positions_count() <= 2);
            orders
        });

        let result = bt.run(&strategy, &ParamSet::new()).unwrap();
        prop_assert_eq!(
            result.diagnostics.opened,
            result.trades.len() + result.open_positions.len()
        );
        for symbol in ["SPY", "QQQ"] {
            let trades: Vec<_> = result.trades.iter().filter(|t| t.symbol == symbol).collect();
            for pair in trades.windows(2) {
                prop_assert!(pair[1].entry_time >= pair[0].exit_time);
            }
            prop_assert!(result.open_positions.iter().filter(|p| p.symbol == symbol).count() <= 1);
        }
    }
}

// ── 3. Equity continuity ─────────────────────────────────────────────

proptest! {
    #[test]
    fn one_equity_sample_per_bar(
        prices in arb_prices(1..80),
        gaps in prop::collection::vec(any::<bool>(), 80),
    ) {
        // Second instrument prints on a random subset of the reference bars.
        let iwm: Vec<Bar> = bars_from(&prices)
            .into_iter()
            .zip(&gaps)
            .filter(|(_, keep)| **keep)
            .map(|(b, _)| b)
            .collect();
        let market = MarketData::new()
            .with_symbol("SPY", bars_from(&prices))
            .unwrap()
            .with_symbol("IWM", iwm)
            .unwrap();
        let bt = Backtester::new(config(&["SPY", "IWM"]), &market).unwrap();
        let strategy = from_fn("hold_iwm", |_, _, _| vec![Order::buy("IWM", 0.5)]);

        let result = bt.run(&strategy, &ParamSet::new()).unwrap();
        prop_assert_eq!(result.equity_curve.len(), prices.len());
        prop_assert_eq!(result.bars_processed, prices.len());
        for w in result.equity_curve.windows(2) {
            prop_assert!(w[0].timestamp < w[1].timestamp);
        }
        prop_assert!(result.equity_curve.iter().all(|p| p.equity.is_finite() && p.equity > 0.0));
    }
}

// ── 4. Ignored intents never move cash ───────────────────────────────

proptest! {
    #[test]
    fn invalid_allocations_leave_cash_untouched(
        prices in arb_prices(1..20),
        alloc in prop_oneof![(-2.0..=0.0_f64), (1.0001..5.0_f64)],
    ) {
        let market = MarketData::new().with_symbol("SPY", bars_from(&prices)).unwrap();
        let bt = Backtester::new(config(&["SPY"]), &market).unwrap();
        let strategy = from_fn("bad_alloc", move |_, _, _| {
            vec![Order::buy("SPY", alloc), Order::sell("SPY", alloc), Order::close("SPY")]
        });

        let result = bt.run(&strategy, &ParamSet::new()).unwrap();
        prop_assert_eq!(result.final_cash, result.initial_cash);
        prop_assert_eq!(result.diagnostics.ignored_total(), 3 * prices.len());
        prop_assert!(result.equity_curve.iter().all(|p| p.equity == result.initial_cash));
    }
}
