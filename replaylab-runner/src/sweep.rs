//! Parameter search: exhaustive grid search and cached coordinate descent.
//!
//! Both drivers share one primitive: run a full backtest for a combination
//! on a fresh ledger and reduce it to [`PerformanceStats`]. Results are
//! ranked descending by the selected [`FitnessMetric`]; combinations that
//! closed no trades have no stats and rank last in evaluation order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

use replaylab_core::engine::{Backtester, EngineError};
use replaylab_core::Strategy;

use crate::cache::{ComboId, ResultCache};
use crate::fitness::FitnessMetric;
use crate::metrics::PerformanceStats;
use crate::params::{ParamError, ParamGrid, ParamSet, ParamSetExt};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Param(#[from] ParamError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    #[default]
    Grid,
    CoordinateDescent,
}

impl SearchMethod {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::CoordinateDescent => "coordinate_descent",
        }
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SearchMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grid" => Ok(Self::Grid),
            "coordinate_descent" | "coordinate-descent" => Ok(Self::CoordinateDescent),
            other => Err(format!("unknown search method '{other}'")),
        }
    }
}

/// One evaluated combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchEntry {
    pub id: ComboId,
    pub params: ParamSet,
    pub stats: Option<PerformanceStats>,
    /// Value of the ranking metric; `None` without stats.
    pub score: Option<f64>,
}

impl SearchEntry {
    fn new(params: ParamSet, stats: Option<PerformanceStats>, metric: FitnessMetric) -> Self {
        let score = stats.as_ref().map(|s| metric.extract(s));
        Self {
            id: ComboId::of(&params),
            params,
            stats,
            score,
        }
    }
}

/// Outcome of a search, entries ranked best first.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub method: SearchMethod,
    pub metric: FitnessMetric,
    pub entries: Vec<SearchEntry>,
    /// Backtests actually simulated.
    pub simulations: usize,
    pub passes: usize,
    pub converged: bool,
}

impl SearchReport {
    pub fn best(&self) -> Option<&SearchEntry> {
        self.entries.first().filter(|e| e.stats.is_some())
    }

    pub fn top(&self, n: usize) -> &[SearchEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Stable descending sort by score; entries without a score go last.
pub fn rank_entries(entries: &mut [SearchEntry]) {
    entries.sort_by(|a, b| match (a.score, b.score) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Search driver over one backtester and strategy.
pub struct ParamSearch<'a> {
    backtester: &'a Backtester,
    strategy: &'a dyn Strategy,
    metric: FitnessMetric,
    parallel: bool,
}

impl<'a> ParamSearch<'a> {
    pub fn new(backtester: &'a Backtester, strategy: &'a dyn Strategy) -> Self {
        Self {
            backtester,
            strategy,
            metric: FitnessMetric::default(),
            parallel: false,
        }
    }

    pub fn with_metric(mut self, metric: FitnessMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Run grid combinations on the rayon pool. Off by default.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn metric(&self) -> FitnessMetric {
        self.metric
    }

    /// One full backtest on a fresh ledger.
    pub fn evaluate(&self, params: &ParamSet) -> Result<Option<PerformanceStats>, EngineError> {
        let result = self.backtester.run(self.strategy, params)?;
        let stats = PerformanceStats::from_run(&result);
        debug!(
            combo = %params.canonical_key(),
            trades = result.trades.len(),
            "combination evaluated"
        );
        Ok(stats)
    }

    /// Simulate every combination of the grid independently.
    pub fn grid_search(&self, grid: &ParamGrid) -> Result<SearchReport, SearchError> {
        if grid.is_empty() {
            return Err(ParamError::EmptyGrid.into());
        }
        let combos = grid.combinations();
        info!(
            combinations = combos.len(),
            parallel = self.parallel,
            metric = %self.metric,
            "grid search started"
        );

        // collect keeps enumeration order on both paths
        let stats: Vec<Option<PerformanceStats>> = if self.parallel {
            combos
                .par_iter()
                .map(|p| self.evaluate(p))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            combos
                .iter()
                .map(|p| self.evaluate(p))
                .collect::<Result<Vec<_>, _>>()?
        };

        let simulations = combos.len();
        let mut entries: Vec<SearchEntry> = combos
            .into_iter()
            .zip(stats)
            .map(|(p, s)| SearchEntry::new(p, s, self.metric))
            .collect();
        rank_entries(&mut entries);

        info!(simulations, "grid search finished");
        Ok(SearchReport {
            method: SearchMethod::Grid,
            metric: self.metric,
            entries,
            simulations,
            passes: 1,
            converged: true,
        })
    }

    /// Optimize one parameter at a time from the grid medians.
    ///
    /// Each pass sweeps every parameter in declaration order, holding the
    /// others at the current best. Repeated combinations come from the
    /// cache. Stops when a pass leaves the best combination unchanged or
    /// after `max_passes`.
    pub fn coordinate_descent(
        &self,
        grid: &ParamGrid,
        max_passes: usize,
    ) -> Result<SearchReport, SearchError> {
        if grid.is_empty() {
            return Err(ParamError::EmptyGrid.into());
        }
        info!(parameters = grid.len(), max_passes, metric = %self.metric, "coordinate descent started");

        let mut cache = ResultCache::new();
        let mut evaluated: Vec<ParamSet> = Vec::new();
        let mut best = grid.medians();
        let mut passes = 0;
        let mut converged = false;

        for pass in 1..=max_passes {
            let start = best.clone();

            for (name, candidates) in grid.axes() {
                let mut chosen = best[name].clone();
                let mut chosen_score = f64::NEG_INFINITY;

                for value in candidates {
                    let mut trial = best.clone();
                    trial.insert(name.clone(), value.clone());

                    let stats = match cache.get(&trial) {
                        Some(hit) => hit.stats.clone(),
                        None => {
                            let stats = self.evaluate(&trial)?;
                            cache.put(trial.clone(), stats.clone());
                            evaluated.push(trial);
                            stats
                        }
                    };

                    let score = stats
                        .as_ref()
                        .map_or(f64::NEG_INFINITY, |s| self.metric.extract(s));
                    if self.metric.is_better(score, chosen_score) {
                        chosen = value.clone();
                        chosen_score = score;
                    }
                }

                best.insert(name.clone(), chosen);
            }

            passes = pass;
            info!(pass, best = %best.canonical_key(), simulations = cache.len(), "pass complete");
            if best == start {
                converged = true;
                break;
            }
        }

        let simulations = cache.len();
        let cache_hits = cache.hits();
        let mut entries: Vec<SearchEntry> = evaluated
            .into_iter()
            .map(|p| {
                let stats = cache.get(&p).and_then(|hit| hit.stats.clone());
                SearchEntry::new(p, stats, self.metric)
            })
            .collect();
        rank_entries(&mut entries);

        info!(simulations, passes, converged, cache_hits, "coordinate descent finished");
        Ok(SearchReport {
            method: SearchMethod::CoordinateDescent,
            metric: self.metric,
            entries,
            simulations,
            passes,
            converged,
        })
    }

    /// Dispatch on `method`.
    pub fn run(
        &self,
        method: SearchMethod,
        grid: &ParamGrid,
        max_passes: usize,
    ) -> Result<SearchReport, SearchError> {
        match method {
            SearchMethod::Grid => self.grid_search(grid),
            SearchMethod::CoordinateDescent => self.coordinate_descent(grid, max_passes),
        }
    }
}
