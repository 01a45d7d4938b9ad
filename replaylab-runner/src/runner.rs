//! Experiment runner: wires config, data provider, engine, statistics and
//! search together.
//!
//! - `run_experiment()`: one backtest with the `[strategy]` params.
//! - `optimize_experiment()`: grid search or coordinate descent per `[optimize]`.

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use replaylab_core::engine::{Backtester, EngineError, RunResult};

use crate::config::{ConfigError, ExperimentConfig};
use crate::metrics::PerformanceStats;
use crate::params::ParamSet;
use crate::sweep::{ParamSearch, SearchError, SearchReport};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("search error: {0}")]
    Search(#[from] SearchError),
}

/// One finished backtest plus its statistics (`None` without trades).
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub params: ParamSet,
    pub result: RunResult,
    pub stats: Option<PerformanceStats>,
}

impl RunReport {
    pub fn new(params: ParamSet, result: RunResult) -> Self {
        let stats = PerformanceStats::from_run(&result);
        Self {
            params,
            result,
            stats,
        }
    }
}

/// Load the universe through the configured provider.
pub fn build_backtester(config: &ExperimentConfig) -> Result<Backtester, RunError> {
    let provider = config.provider()?;
    let engine = config.engine_config();
    info!(
        provider = provider.name(),
        symbols = ?engine.symbols,
        start = %engine.start_date,
        end = %engine.end_date,
        "loading market data"
    );
    Ok(Backtester::from_provider(engine, provider.as_ref())?)
}

pub fn run_experiment(config: &ExperimentConfig) -> Result<RunReport, RunError> {
    let backtester = build_backtester(config)?;
    run_with(&backtester, config)
}

/// Run the configured strategy on an already-loaded backtester.
pub fn run_with(backtester: &Backtester, config: &ExperimentConfig) -> Result<RunReport, RunError> {
    let strategy = config.strategy()?;
    let params = config.strategy.params.clone();
    let result = backtester.run(strategy.as_ref(), &params)?;
    Ok(RunReport::new(params, result))
}

pub fn optimize_experiment(config: &ExperimentConfig) -> Result<SearchReport, RunError> {
    let backtester = build_backtester(config)?;
    optimize_with(&backtester, config)
}

pub fn optimize_with(
    backtester: &Backtester,
    config: &ExperimentConfig,
) -> Result<SearchReport, RunError> {
    let opt = config.optimize()?;
    let strategy = config.strategy()?;
    let search = ParamSearch::new(backtester, strategy.as_ref())
        .with_metric(opt.metric)
        .with_parallelism(opt.parallel);
    Ok(search.run(opt.method, &opt.grid, opt.max_passes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::SearchMethod;

    const EXPERIMENT: &str = r#"
        [backtest]
        symbols = ["SPY"]
        start_date = "2024-01-02"
        end_date = "2024-01-06"
        initial_cash = 10000.0
        resolution = "hour"

        [data]
        seed = 11

        [strategy]
        name = "ma_cross"
        params = { fast = 2, slow = 4, allow_short = true }

        [optimize]
        method = "grid"
        metric = "total_return"

        [optimize.grid]
        fast = [2, 3]
        slow = [5, 8]
    "#;

    #[test]
    fn run_experiment_on_synthetic_data() {
        let config = ExperimentConfig::from_toml(EXPERIMENT).unwrap();
        let report = run_experiment(&config).unwrap();
        // Four weekdays of 7 hourly bars (09:30 to 15:30).
        assert_eq!(report.result.bars_processed, 28);
        assert_eq!(report.result.equity_curve.len(), 28);
        assert_eq!(report.stats.is_some(), !report.result.trades.is_empty());
    }

    #[test]
    fn optimize_experiment_runs_the_full_grid() {
        let config = ExperimentConfig::from_toml(EXPERIMENT).unwrap();
        let report = optimize_experiment(&config).unwrap();
        assert_eq!(report.method, SearchMethod::Grid);
        assert_eq!(report.simulations, 4);
        assert_eq!(report.len(), 4);
    }

    #[test]
    fn unknown_symbol_in_csv_dir_is_an_engine_error() {
        let dir = tempfile::tempdir().unwrap();
        let toml = EXPERIMENT.replace(
            "seed = 11",
            &format!("source = \"csv\"\ndir = {:?}", dir.path().display().to_string()),
        );
        let config = ExperimentConfig::from_toml(&toml).unwrap();
        let err = run_experiment(&config).unwrap_err();
        assert!(matches!(
            err,
            RunError::Engine(EngineError::UnknownInstrument { ref symbol }) if symbol == "SPY"
        ));
    }
}
