//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over data sources (injected tables, CSV
//! directories, synthetic generators) so the engine never knows where bars
//! came from and tests can hand it fixtures directly.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::domain::Bar;

/// Bar granularity requested from a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    #[default]
    Minute,
    Hour,
    Daily,
}

impl Resolution {
    /// Bar spacing in minutes within a trading session.
    pub fn step_minutes(&self) -> i64 {
        match self {
            Self::Minute => 1,
            Self::Hour => 60,
            Self::Daily => 24 * 60,
        }
    }
}

impl FromStr for Resolution {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minute" => Ok(Self::Minute),
            "hour" => Ok(Self::Hour),
            "daily" | "day" => Ok(Self::Daily),
            other => Err(DataError::Validation(format!("unknown resolution '{other}'"))),
        }
    }
}

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Source of historical OHLC bars.
///
/// Implementations return bars for `[start, end)` in ascending timestamp
/// order. The loop derives its clock from the reference instrument, so
/// providers should emit the same timestamp grid for every symbol they serve.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch bars for a symbol over a date range.
    fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> Result<Vec<Bar>, DataError>;
}
