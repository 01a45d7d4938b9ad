//! In-memory provider serving injected bar tables.

use chrono::{NaiveDate, NaiveTime};
use std::collections::HashMap;

use super::provider::{DataError, DataProvider, Resolution};
use crate::domain::Bar;

/// Serves bars handed to it up front. Resolution is ignored: the tables are
/// returned at whatever spacing they were built with.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    tables: HashMap<String, Vec<Bar>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bars(mut self, symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        self.tables.insert(symbol.into(), bars);
        self
    }
}

impl DataProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        _resolution: Resolution,
    ) -> Result<Vec<Bar>, DataError> {
        let bars = self
            .tables
            .get(symbol)
            .ok_or_else(|| DataError::SymbolNotFound { symbol: symbol.to_string() })?;
        let lo = start.and_time(NaiveTime::MIN);
        let hi = end.and_time(NaiveTime::MIN);
        Ok(bars
            .iter()
            .filter(|b| b.timestamp >= lo && b.timestamp < hi)
            .copied()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_to_half_open_window() {
        let bars: Vec<Bar> = (1..=5)
            .map(|d| {
                let ts = NaiveDate::from_ymd_opt(2024, 1, d)
                    .unwrap()
                    .and_hms_opt(16, 0, 0)
                    .unwrap();
                Bar::new(ts, 1.0, 1.0, 1.0, 1.0)
            })
            .collect();
        let provider = InMemoryProvider::new().with_bars("SPY", bars);
        let got = provider
            .history(
                "SPY",
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(),
                Resolution::Daily,
            )
            .unwrap();
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn unknown_symbol_is_an_error() {
        let provider = InMemoryProvider::new();
        let err = provider.history(
            "NOPE",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            Resolution::Minute,
        );
        assert!(matches!(err, Err(DataError::SymbolNotFound { .. })));
    }
}
