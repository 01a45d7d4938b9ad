//! Seeded random-walk bars for demos, benches and tests.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use rand::Rng;

use super::provider::{DataError, DataProvider, Resolution};
use crate::domain::Bar;
use crate::rng::SeedTree;

/// Generates a reproducible random walk per symbol on weekdays.
///
/// Every symbol shares the same timestamp grid: intraday resolutions emit
/// bars from `session_open` (inclusive) to `session_close` (exclusive);
/// daily resolution emits one bar per weekday stamped at `session_close`.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    seeds: SeedTree,
    pub start_price: f64,
    /// Maximum absolute per-bar return.
    pub volatility: f64,
    pub session_open: NaiveTime,
    pub session_close: NaiveTime,
}

impl SyntheticProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            seeds: SeedTree::new(seed),
            start_price: 100.0,
            volatility: 0.002,
            session_open: NaiveTime::from_hms_opt(9, 30, 0).expect("09:30 is a valid time"),
            session_close: NaiveTime::from_hms_opt(16, 0, 0).expect("16:00 is a valid time"),
        }
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    pub fn with_start_price(mut self, price: f64) -> Self {
        self.start_price = price;
        self
    }
}

fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> Result<Vec<Bar>, DataError> {
        if self.start_price.is_nan() || self.start_price <= 0.0 || !self.volatility.is_finite() || self.volatility < 0.0 {
            return Err(DataError::Validation(format!(
                "synthetic provider needs a positive start price and finite volatility, got {} / {}",
                self.start_price, self.volatility
            )));
        }
        if self.session_open >= self.session_close {
            return Err(DataError::Validation(
                "session_open must precede session_close".into(),
            ));
        }

        let mut rng = self.seeds.rng_for(symbol);
        let step = Duration::minutes(resolution.step_minutes());
        let mut price = self.start_price;
        let mut bars = Vec::new();

        let mut date = start;
        while date < end {
            if is_weekday(date) {
                let stamps: Vec<_> = match resolution {
                    Resolution::Daily => vec![date.and_time(self.session_close)],
                    Resolution::Minute | Resolution::Hour => {
                        let close = date.and_time(self.session_close);
                        let mut ts = date.and_time(self.session_open);
                        let mut out = Vec::new();
                        while ts < close {
                            out.push(ts);
                            ts += step;
                        }
                        out
                    }
                };
                for timestamp in stamps {
                    let open = price;
                    let ret = if self.volatility > 0.0 {
                        rng.gen_range(-self.volatility..=self.volatility)
                    } else {
                        0.0
                    };
                    let close = (open * (1.0 + ret)).max(0.01);
                    let wick = if self.volatility > 0.0 {
                        rng.gen_range(0.0..=self.volatility / 2.0)
                    } else {
                        0.0
                    };
                    let mut bar = Bar::new(
                        timestamp,
                        open,
                        open.max(close) * (1.0 + wick),
                        open.min(close) * (1.0 - wick),
                        close,
                    );
                    bar.volume = rng.gen_range(1_000.0..10_000.0_f64).round();
                    bars.push(bar);
                    price = close;
                }
            }
            date = match date.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
        Ok(bars)
    }
}
