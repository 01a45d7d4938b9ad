//! ReplayLab Runner: statistics, parameter search and experiment plumbing.
//!
//! This crate builds on `replaylab-core` to provide:
//! - Weighted performance statistics over a run's trades and equity
//! - Metric selection by name for ranking
//! - Parameter grids with normalized values
//! - Grid search and cached coordinate descent
//! - TOML experiment configuration
//! - CSV/JSON artifact export

pub mod cache;
pub mod config;
pub mod export;
pub mod fitness;
pub mod metrics;
pub mod params;
pub mod runner;
pub mod sweep;

pub use cache::{CachedResult, ComboId, ResultCache};
pub use config::{ConfigError, DataSource, ExperimentConfig};
pub use fitness::{FitnessMetric, UnknownMetric};
pub use metrics::PerformanceStats;
pub use params::{median_value, ParamError, ParamGrid, ParamSet, ParamSetExt, ParamValue};
pub use runner::{
    build_backtester, optimize_experiment, optimize_with, run_experiment, run_with, RunError,
    RunReport,
};
pub use sweep::{rank_entries, ParamSearch, SearchEntry, SearchError, SearchMethod, SearchReport};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn performance_stats_is_send_sync() {
        assert_send::<PerformanceStats>();
        assert_sync::<PerformanceStats>();
    }

    #[test]
    fn search_types_are_send_sync() {
        assert_send::<ParamGrid>();
        assert_sync::<ParamGrid>();
        assert_send::<SearchReport>();
        assert_sync::<SearchReport>();
        assert_send::<ParamSearch<'static>>();
        assert_sync::<ParamSearch<'static>>();
        assert_send::<ResultCache>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<ExperimentConfig>();
        assert_sync::<ExperimentConfig>();
        assert_send::<RunReport>();
        assert_sync::<RunReport>();
    }
}
