//! Criterion benchmarks for ReplayLab hot paths.
//!
//! Benchmarks:
//! 1. Bar event loop (full backtest over a synthetic minute universe)
//! 2. Execution of a single open/close round trip
//! 3. History lookups through the bar index

use chrono::{NaiveDate, NaiveDateTime};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use replaylab_core::data::{BarSeries, DataProvider, MarketData, Resolution, SyntheticProvider};
use replaylab_core::domain::{Bar, Order};
use replaylab_core::engine::{execute, Backtester, EngineConfig};
use replaylab_core::ledger::Ledger;
use replaylab_core::params::{ParamSet, ParamValue};
use replaylab_core::strategies::MovingAverageCross;

// ── Helpers ──────────────────────────────────────────────────────────

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn ts() -> NaiveDateTime {
    day(2).and_hms_opt(10, 0, 0).unwrap()
}

fn ma_params() -> ParamSet {
    let mut p = ParamSet::new();
    p.insert("fast".into(), ParamValue::Int(10));
    p.insert("slow".into(), ParamValue::Int(30));
    p.insert("allow_short".into(), ParamValue::Bool(true));
    p
}

// ── 1. Event loop ────────────────────────────────────────────────────

fn bench_event_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_loop");
    let provider = SyntheticProvider::new(7).with_volatility(0.004);

    for days in [1u32, 5] {
        let config = EngineConfig::new(
            vec!["SPY".into(), "QQQ".into()],
            day(2),
            day(2 + days),
            100_000.0,
        )
        .with_resolution(Resolution::Minute);
        let bt = Backtester::from_provider(config, &provider).unwrap();
        let params = ma_params();

        group.bench_with_input(BenchmarkId::new("ma_cross", bt.clock().len()), &bt, |b, bt| {
            b.iter(|| bt.run(black_box(&MovingAverageCross), black_box(&params)).unwrap())
        });
    }
    group.finish();
}

// ── 2. Execution ─────────────────────────────────────────────────────

fn bench_execution(c: &mut Criterion) {
    let bar = Bar::new(ts(), 100.0, 101.0, 99.0, 100.5);
    c.bench_function("execute_round_trip", |b| {
        b.iter(|| {
            let mut ledger = Ledger::new(10_000.0);
            execute(&mut ledger, Order::buy("SPY", 0.5), Some(&bar), ts());
            execute(&mut ledger, Order::close("SPY"), Some(&bar), ts());
            black_box(ledger.cash())
        })
    });
}

// ── 3. History lookups ───────────────────────────────────────────────

fn bench_history(c: &mut Criterion) {
    let bars = SyntheticProvider::new(3)
        .history("SPY", day(2), day(12), Resolution::Minute)
        .unwrap();
    let probe = bars[bars.len() / 2].timestamp;
    let series = BarSeries::new(bars.clone()).unwrap();
    let market = MarketData::new().with_symbol("SPY", bars).unwrap();

    c.bench_function("series_up_to_lookback_30", |b| {
        b.iter(|| black_box(series.up_to(black_box(probe), Some(30)).len()))
    });
    c.bench_function("market_clock", |b| b.iter(|| black_box(market.clock().len())));
}

criterion_group!(benches, bench_event_loop, bench_execution, bench_history);
criterion_main!(benches);
