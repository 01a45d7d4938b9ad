//! CSV bar files: one `<SYMBOL>.csv` per instrument in a directory.
//!
//! Header: `timestamp,open,high,low,close[,volume]`. Timestamps may be
//! `YYYY-MM-DD HH:MM:SS`, ISO-8601 with a `T`, `YYYY-MM-DD HH:MM`, or a bare
//! date (midnight). Rows with NaN, non-positive or out-of-order OHLC values
//! are rejected.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::provider::{DataError, DataProvider, Resolution};
use crate::domain::Bar;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in [TIMESTAMP_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Reads every bar in a CSV file, unsorted and unfiltered.
pub fn read_bars_csv(path: &Path) -> Result<Vec<Bar>, DataError> {
    let display = path.display().to_string();
    let mut reader = csv::Reader::from_path(path).map_err(|source| DataError::Csv {
        path: display.clone(),
        source,
    })?;

    let mut bars = Vec::new();
    for (line, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row.map_err(|source| DataError::Csv {
            path: display.clone(),
            source,
        })?;
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| {
            DataError::Validation(format!(
                "{display}: row {}: unparseable timestamp '{}'",
                line + 1,
                row.timestamp
            ))
        })?;
        let mut bar = Bar::new(timestamp, row.open, row.high, row.low, row.close);
        bar.volume = row.volume.unwrap_or(0.0);
        if !bar.is_sane() {
            return Err(DataError::Validation(format!(
                "{display}: row {}: OHLC out of order or non-positive at {} ({} / {} / {} / {})",
                line + 1,
                row.timestamp,
                bar.open,
                bar.high,
                bar.low,
                bar.close
            )));
        }
        bars.push(bar);
    }
    Ok(bars)
}

/// Writes bars in the format [`read_bars_csv`] accepts.
pub fn write_bars_csv(path: &Path, bars: &[Bar]) -> Result<(), DataError> {
    let display = path.display().to_string();
    let csv_err = |source| DataError::Csv {
        path: display.clone(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer
        .write_record(["timestamp", "open", "high", "low", "close", "volume"])
        .map_err(csv_err)?;
    for bar in bars {
        writer
            .write_record([
                bar.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
                bar.volume.to_string(),
            ])
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|source| DataError::Io {
        path: display.clone(),
        source,
    })?;
    Ok(())
}

/// Provider backed by a directory of per-symbol CSV files.
///
/// Files are assumed to already be at the requested resolution.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    root: PathBuf,
}

impl CsvProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.root.join(format!("{symbol}.csv"))
    }
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        _resolution: Resolution,
    ) -> Result<Vec<Bar>, DataError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        let lo = start.and_time(NaiveTime::MIN);
        let hi = end.and_time(NaiveTime::MIN);
        let mut bars: Vec<Bar> = read_bars_csv(&path)?
            .into_iter()
            .filter(|b| b.timestamp >= lo && b.timestamp < hi)
            .collect();
        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}
