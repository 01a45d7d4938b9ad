//! Market data: provider seam, per-instrument bar tables and sources.

pub mod csv_store;
pub mod market;
pub mod memory;
pub mod provider;
pub mod synthetic;

pub use csv_store::{read_bars_csv, write_bars_csv, CsvProvider};
pub use market::{BarSeries, MarketData};
pub use memory::InMemoryProvider;
pub use provider::{DataError, DataProvider, Resolution};
pub use synthetic::SyntheticProvider;
