//! TOML experiment configuration.
//!
//! ```toml
//! [backtest]
//! symbols = ["SPY", "QQQ"]
//! start_date = "2024-01-02"
//! end_date = "2024-02-01"
//! initial_cash = 10000.0
//! resolution = "minute"
//!
//! [data]
//! source = "synthetic"
//! seed = 42
//!
//! [strategy]
//! name = "ma_cross"
//! params = { fast = 10, slow = 30 }
//!
//! [optimize]
//! method = "coordinate_descent"
//! metric = "sharpe_ratio"
//! max_passes = 10
//!
//! [optimize.grid]
//! fast = [5, 10, 20]
//! slow = [30, 50, 100]
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use replaylab_core::data::{CsvProvider, DataProvider, Resolution, SyntheticProvider};
use replaylab_core::engine::EngineConfig;
use replaylab_core::strategies;
use replaylab_core::Strategy;

use crate::fitness::FitnessMetric;
use crate::params::{ParamGrid, ParamSet};
use crate::sweep::SearchMethod;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown strategy '{0}'")]
    UnknownStrategy(String),

    #[error("data source 'csv' requires [data] dir")]
    MissingDataDir,

    #[error("[optimize] section is required for optimization")]
    MissingOptimize,

    #[error("[optimize.grid] must declare at least one parameter")]
    EmptyGrid,

    #[error("max_passes must be at least 1")]
    ZeroPasses,
}

/// Top-level experiment file.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub data: DataSection,
    pub strategy: StrategySection,
    pub optimize: Option<OptimizeSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub symbols: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
    #[serde(default)]
    pub resolution: Resolution,
}

fn default_initial_cash() -> f64 {
    10_000.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Csv,
    #[default]
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    #[serde(default)]
    pub source: DataSource,
    /// Directory holding `<SYMBOL>.csv` files.
    pub dir: Option<PathBuf>,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_seed() -> u64 {
    42
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            source: DataSource::default(),
            dir: None,
            seed: default_seed(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategySection {
    pub name: String,
    #[serde(default)]
    pub params: ParamSet,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptimizeSection {
    #[serde(default)]
    pub method: SearchMethod,
    #[serde(default)]
    pub metric: FitnessMetric,
    #[serde(default = "default_max_passes")]
    pub max_passes: usize,
    #[serde(default)]
    pub parallel: bool,
    pub grid: ParamGrid,
}

fn default_max_passes() -> usize {
    10
}

impl ExperimentConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Checks that do not need data. Engine-level checks (window, cash,
    /// universe) run when the backtester is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if strategies::by_name(&self.strategy.name).is_none() {
            return Err(ConfigError::UnknownStrategy(self.strategy.name.clone()));
        }
        if self.data.source == DataSource::Csv && self.data.dir.is_none() {
            return Err(ConfigError::MissingDataDir);
        }
        if let Some(opt) = &self.optimize {
            if opt.grid.is_empty() {
                return Err(ConfigError::EmptyGrid);
            }
            if opt.method == SearchMethod::CoordinateDescent && opt.max_passes == 0 {
                return Err(ConfigError::ZeroPasses);
            }
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        let b = &self.backtest;
        EngineConfig::new(b.symbols.clone(), b.start_date, b.end_date, b.initial_cash)
            .with_resolution(b.resolution)
    }

    pub fn provider(&self) -> Result<Box<dyn DataProvider>, ConfigError> {
        match self.data.source {
            DataSource::Synthetic => Ok(Box::new(SyntheticProvider::new(self.data.seed))),
            DataSource::Csv => {
                let dir = self.data.dir.clone().ok_or(ConfigError::MissingDataDir)?;
                Ok(Box::new(CsvProvider::new(dir)))
            }
        }
    }

    pub fn strategy(&self) -> Result<Box<dyn Strategy>, ConfigError> {
        strategies::by_name(&self.strategy.name)
            .ok_or_else(|| ConfigError::UnknownStrategy(self.strategy.name.clone()))
    }

    pub fn optimize(&self) -> Result<&OptimizeSection, ConfigError> {
        self.optimize.as_ref().ok_or(ConfigError::MissingOptimize)
    }
}
