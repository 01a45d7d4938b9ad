//! End-to-end engine scenarios: sizing, short accounting, sequential intent
//! application, missing bars and per-run state isolation.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde_json::json;

use replaylab_core::data::{DataProvider, InMemoryProvider, MarketData, Resolution, SyntheticProvider};
use replaylab_core::domain::{Bar, Direction, Metadata, Order};
use replaylab_core::engine::{Backtester, EngineConfig, EngineError, IgnoreReason};
use replaylab_core::strategies::BuyAndHold;
use replaylab_core::{from_fn, ParamSet, ParamValue};

// ── Helpers ──────────────────────────────────────────────────────────

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

fn bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::new(t0() + Duration::minutes(i as i64), c, c, c, c))
        .collect()
}

fn config(symbols: &[&str]) -> EngineConfig {
    EngineConfig::new(
        symbols.iter().map(|s| s.to_string()).collect(),
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        10_000.0,
    )
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn long_full_allocation_round_trip() {
    let market = MarketData::new().with_symbol("SPY", bars(&[100.0, 110.0])).unwrap();
    let bt = Backtester::new(config(&["SPY"]), &market).unwrap();
    let strategy = from_fn("long_once", |ctx, _, _| match ctx.bar_index() {
        0 => vec![Order::buy("SPY", 1.0)],
        1 => vec![Order::close("SPY")],
        _ => vec![],
    });

    let result = bt.run(&strategy, &ParamSet::new()).unwrap();
    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.quantity, 100);
    assert_eq!(trade.pnl, 1_000.0);
    assert!((trade.return_pct - 0.10).abs() < 1e-12);
    assert_eq!(result.final_cash, 11_000.0);
    assert_eq!(result.equity_values(), vec![10_000.0, 11_000.0]);
}

#[test]
fn short_half_allocation_round_trip() {
    let market = MarketData::new().with_symbol("QQQ", bars(&[50.0, 45.0, 40.0])).unwrap();
    let bt = Backtester::new(config(&["QQQ"]), &market).unwrap();
    let strategy = from_fn("short_once", |ctx, _, _| match ctx.bar_index() {
        0 => vec![Order::sell("QQQ", 0.5)],
        2 => vec![Order::close("QQQ")],
        _ => vec![],
    });

    let result = bt.run(&strategy, &ParamSet::new()).unwrap();
    let trade = &result.trades[0];
    assert_eq!(trade.direction, Direction::Short);
    assert_eq!(trade.quantity, 100);
    assert_eq!(trade.pnl, 1_000.0);
    assert!((trade.return_pct - 0.20).abs() < 1e-12);
    assert_eq!(trade.weight, 0.5);
    assert_eq!(result.final_cash, 11_000.0);
    // cash 5000 + 100 × (2 × 50 − 45) mid-trade
    assert_eq!(result.equity_values(), vec![10_000.0, 10_500.0, 11_000.0]);
}

#[test]
fn close_then_reenter_in_one_batch_is_sequential() {
    let market = MarketData::new().with_symbol("SPY", bars(&[100.0, 200.0])).unwrap();
    let bt = Backtester::new(config(&["SPY"]), &market).unwrap();
    let strategy = from_fn("flip", |ctx, _, _| match ctx.bar_index() {
        0 => vec![Order::buy("SPY", 1.0)],
        1 => vec![Order::close("SPY"), Order::sell("SPY", 0.5)],
        _ => vec![],
    });

    let result = bt.run(&strategy, &ParamSet::new()).unwrap();
    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.open_positions.len(), 1);
    let short = &result.open_positions[0];
    assert_eq!(short.direction, Direction::Short);
    // 20000 after the close, half of it at 200.
    assert_eq!(short.quantity, 50);
    assert_eq!(result.diagnostics.opened, 2);
    assert_eq!(result.diagnostics.closed, 1);
}

#[test]
fn duplicate_entries_are_counted_not_applied() {
    let market = MarketData::new().with_symbol("SPY", bars(&[100.0, 101.0, 102.0])).unwrap();
    let bt = Backtester::new(config(&["SPY"]), &market).unwrap();
    let strategy = from_fn("greedy", |_, _, _| vec![Order::buy("SPY", 0.5)]);

    let result = bt.run(&strategy, &ParamSet::new()).unwrap();
    assert_eq!(result.diagnostics.opened, 1);
    assert_eq!(result.diagnostics.ignored[&IgnoreReason::PositionOpen], 2);
    assert_eq!(result.open_positions.len(), 1);
    assert!(result.trades.is_empty());
}

#[test]
fn instruments_missing_a_bar_are_left_out_and_carried() {
    let spy = bars(&[100.0, 100.0, 100.0]);
    // IWM only prints on the first bar.
    let iwm = bars(&[20.0]);
    let market = MarketData::new()
        .with_symbol("SPY", spy)
        .unwrap()
        .with_symbol("IWM", iwm)
        .unwrap();
    let bt = Backtester::new(config(&["SPY", "IWM"]), &market).unwrap();

    let strategy = from_fn("iwm", |ctx, bars, _| {
        if ctx.bar_index() > 0 {
            assert!(!bars.contains("IWM"));
            assert!(bars.contains("SPY"));
        }
        match ctx.bar_index() {
            0 => vec![Order::buy("IWM", 1.0)],
            // No IWM bar and no override: nothing to fill at.
            1 => vec![Order::close("IWM")],
            2 => vec![Order::close("IWM").at_price(25.0)],
            _ => vec![],
        }
    });

    let result = bt.run(&strategy, &ParamSet::new()).unwrap();
    assert_eq!(result.diagnostics.ignored[&IgnoreReason::NoPrice], 1);
    // Carried at its last mark (20) while open, then closed at the override.
    assert_eq!(result.equity_values(), vec![10_000.0, 10_000.0, 12_500.0]);
    assert_eq!(result.trades[0].exit_price, 25.0);
}

#[test]
fn metadata_updates_flow_into_the_trade() {
    let market = MarketData::new()
        .with_symbol("SPY", bars(&[100.0, 105.0, 103.0, 101.0]))
        .unwrap();
    let bt = Backtester::new(config(&["SPY"]), &market).unwrap();
    let strategy = from_fn("trail", |ctx, bars, _| {
        let close = bars.get("SPY").map(|b| b.close).unwrap_or_default();
        if !ctx.has_position("SPY") {
            return if ctx.bar_index() == 0 {
                vec![Order::buy("SPY", 1.0).with_meta("hwm", close)]
            } else {
                vec![]
            };
        }
        let hwm = ctx
            .position("SPY")
            .and_then(|p| p.metadata.get("hwm"))
            .and_then(|v| v.as_f64())
            .unwrap_or(close);
        if close > hwm {
            let mut update = Metadata::new();
            update.insert("hwm".into(), json!(close));
            ctx.update_position_metadata("SPY", update);
            vec![]
        } else if close < hwm * 0.97 {
            vec![Order::close("SPY").with_meta("exit_reason", "trailing_stop")]
        } else {
            vec![]
        }
    });

    let result = bt.run(&strategy, &ParamSet::new()).unwrap();
    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.exit_price, 101.0);
    assert_eq!(trade.metadata["hwm"], json!(105.0));
    assert_eq!(trade.metadata["exit_reason"], json!("trailing_stop"));
}

#[test]
fn scratch_state_starts_fresh_each_run() {
    let market = MarketData::new().with_symbol("SPY", bars(&[1.0, 1.0, 1.0])).unwrap();
    let bt = Backtester::new(config(&["SPY"]), &market).unwrap();
    let strategy = from_fn("counter", |ctx, _, _| {
        let index = ctx.bar_index();
        let seen = ctx.scratch::<Vec<usize>>("counter.seen");
        assert_eq!(seen.len(), index);
        seen.push(index);
        vec![]
    });

    // Each run sees an empty slot at its first bar.
    for _ in 0..2 {
        let result = bt.run(&strategy, &ParamSet::new()).unwrap();
        assert_eq!(result.bars_processed, 3);
    }
}

#[test]
fn open_positions_are_reported_not_closed() {
    let market = MarketData::new().with_symbol("SPY", bars(&[100.0, 120.0])).unwrap();
    let bt = Backtester::new(config(&["SPY"]), &market).unwrap();
    let result = bt.run(&BuyAndHold, &ParamSet::new()).unwrap();
    assert!(result.trades.is_empty());
    assert_eq!(result.open_positions.len(), 1);
    assert_eq!(result.final_equity, 12_000.0);
    assert!((result.total_return() - 0.2).abs() < 1e-12);
}

// ── Providers ────────────────────────────────────────────────────────

#[test]
fn synthetic_universe_runs_end_to_end() {
    let provider = SyntheticProvider::new(42);
    let mut cfg = config(&["SPY", "QQQ"]);
    cfg.end_date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
    let cfg = cfg.with_resolution(Resolution::Hour);
    let bt = Backtester::from_provider(cfg, &provider).unwrap();
    assert_eq!(bt.market().reference_symbol(), Some("SPY"));

    let mut params = ParamSet::new();
    params.insert("allocation".into(), ParamValue::float(0.5).unwrap());
    let result = bt.run(&BuyAndHold, &params).unwrap();
    assert_eq!(result.equity_curve.len(), bt.clock().len());
    assert_eq!(result.open_positions.len(), 2);
    assert!(result
        .equity_curve
        .windows(2)
        .all(|w| w[0].timestamp < w[1].timestamp));
}

#[test]
fn provider_without_symbol_is_unknown_instrument() {
    let provider = InMemoryProvider::new().with_bars("SPY", bars(&[1.0]));
    assert_eq!(provider.name(), "memory");
    let err = Backtester::from_provider(config(&["SPY", "DIA"]), &provider).unwrap_err();
    assert!(matches!(err, EngineError::UnknownInstrument { symbol } if symbol == "DIA"));
}

#[test]
fn invalid_configs_are_fatal() {
    let market = MarketData::new().with_symbol("SPY", bars(&[1.0])).unwrap();
    let mut cfg = config(&["SPY"]);
    cfg.end_date = cfg.start_date;
    assert!(matches!(
        Backtester::new(cfg, &market),
        Err(EngineError::InvalidWindow { .. })
    ));

    let mut cfg = config(&["SPY"]);
    cfg.initial_cash = -5.0;
    assert!(matches!(
        Backtester::new(cfg, &market),
        Err(EngineError::InvalidInitialCash(_))
    ));

    assert!(matches!(
        Backtester::new(config(&[]), &market),
        Err(EngineError::EmptyUniverse)
    ));
}
