//! Fitness function: configurable metric selector for ranking parameter
//! combinations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::metrics::PerformanceStats;

/// Which statistic a search optimizes and sorts by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessMetric {
    #[default]
    SharpeRatio,
    TotalReturn,
    MaxDrawdown,
    CalmarRatio,
    WinRate,
    ProfitFactor,
    AvgReturn,
    NumTrades,
}

impl FitnessMetric {
    pub const ALL: [FitnessMetric; 8] = [
        Self::SharpeRatio,
        Self::TotalReturn,
        Self::MaxDrawdown,
        Self::CalmarRatio,
        Self::WinRate,
        Self::ProfitFactor,
        Self::AvgReturn,
        Self::NumTrades,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::SharpeRatio => "sharpe_ratio",
            Self::TotalReturn => "total_return",
            Self::MaxDrawdown => "max_drawdown",
            Self::CalmarRatio => "calmar_ratio",
            Self::WinRate => "win_rate",
            Self::ProfitFactor => "profit_factor",
            Self::AvgReturn => "avg_return",
            Self::NumTrades => "num_trades",
        }
    }

    /// Extract the metric value from a stats record.
    pub fn extract(&self, stats: &PerformanceStats) -> f64 {
        match self {
            Self::SharpeRatio => stats.sharpe_ratio,
            Self::TotalReturn => stats.total_return,
            Self::MaxDrawdown => stats.max_drawdown,
            Self::CalmarRatio => stats.calmar_ratio,
            Self::WinRate => stats.win_rate,
            Self::ProfitFactor => stats.profit_factor,
            Self::AvgReturn => stats.avg_return,
            Self::NumTrades => stats.num_trades as f64,
        }
    }

    /// Returns true if `a` is strictly better than `b`.
    ///
    /// Higher is better for every metric. Drawdowns are non-positive, so
    /// -0.05 beats -0.20.
    pub fn is_better(&self, a: f64, b: f64) -> bool {
        a > b
    }
}

impl fmt::Display for FitnessMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric '{0}'")]
pub struct UnknownMetric(pub String);

impl FromStr for FitnessMetric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.name() == needle)
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}
