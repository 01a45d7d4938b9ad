//! Artifact export: trade tape and equity CSVs, search-result CSV, and a
//! JSON run summary.
//!
//! Infinite ratios (profit factor or Calmar without losses or drawdown)
//! render as `inf` in CSV and as `null` in JSON.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use replaylab_core::domain::Trade;
use replaylab_core::engine::RunDiagnostics;
use replaylab_core::ledger::EquityPoint;

use crate::metrics::PerformanceStats;
use crate::params::ParamSet;
use crate::runner::RunReport;
use crate::sweep::SearchReport;

/// Current schema version for the JSON summary.
pub const SCHEMA_VERSION: u32 = 1;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn num(v: f64) -> String {
    if v.is_infinite() {
        let sign = if v > 0.0 { "" } else { "-" };
        format!("{sign}inf")
    } else {
        format!("{v:.6}")
    }
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Trade tape. Metadata is written as a JSON object in the last column.
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "direction",
        "entry_time",
        "entry_price",
        "exit_time",
        "exit_price",
        "quantity",
        "pnl",
        "return_pct",
        "weight",
        "metadata",
    ])?;

    for t in trades {
        let metadata =
            serde_json::to_string(&t.metadata).context("failed to serialize trade metadata")?;
        wtr.write_record([
            t.symbol.as_str(),
            t.direction.as_str(),
            &t.entry_time.format(TIMESTAMP_FORMAT).to_string(),
            &num(t.entry_price),
            &t.exit_time.format(TIMESTAMP_FORMAT).to_string(),
            &num(t.exit_price),
            &t.quantity.to_string(),
            &format!("{:.2}", t.pnl),
            &num(t.return_pct),
            &num(t.weight),
            &metadata,
        ])?;
    }
    finish(wtr)
}

pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "equity"])?;
    for p in equity_curve {
        wtr.write_record([
            p.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            format!("{:.2}", p.equity),
        ])?;
    }
    finish(wtr)
}

const STAT_COLUMNS: [&str; 8] = [
    "num_trades",
    "total_return",
    "sharpe_ratio",
    "max_drawdown",
    "calmar_ratio",
    "win_rate",
    "profit_factor",
    "avg_return",
];

fn stat_cells(stats: Option<&PerformanceStats>) -> Vec<String> {
    match stats {
        None => vec![String::new(); STAT_COLUMNS.len()],
        Some(s) => vec![
            s.num_trades.to_string(),
            num(s.total_return),
            num(s.sharpe_ratio),
            num(s.max_drawdown),
            num(s.calmar_ratio),
            num(s.win_rate),
            num(s.profit_factor),
            num(s.avg_return),
        ],
    }
}

/// Ranked search results: one row per combination, one column per parameter.
/// Statistic cells are empty for combinations without trades.
pub fn export_search_csv(report: &SearchReport) -> Result<String> {
    let param_names: Vec<String> = report
        .entries
        .first()
        .map(|e| e.params.keys().cloned().collect())
        .unwrap_or_default();

    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["rank".to_string(), "combo_id".to_string()];
    header.extend(param_names.iter().cloned());
    header.push(format!("score_{}", report.metric));
    header.extend(STAT_COLUMNS.iter().map(|c| c.to_string()));
    wtr.write_record(&header)?;

    for (rank, entry) in report.entries.iter().enumerate() {
        let mut row = vec![(rank + 1).to_string(), entry.id.to_string()];
        row.extend(
            param_names
                .iter()
                .map(|n| entry.params.get(n).map(|v| v.to_string()).unwrap_or_default()),
        );
        row.push(entry.score.map(num).unwrap_or_default());
        row.extend(stat_cells(entry.stats.as_ref()));
        wtr.write_record(&row)?;
    }
    finish(wtr)
}

// ─── JSON summary ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub schema_version: u32,
    pub strategy: &'a str,
    pub params: &'a ParamSet,
    pub initial_cash: f64,
    pub final_cash: f64,
    pub final_equity: f64,
    pub bars_processed: usize,
    pub open_positions: usize,
    pub stats: Option<&'a PerformanceStats>,
    pub diagnostics: &'a RunDiagnostics,
}

impl<'a> RunSummary<'a> {
    pub fn of(report: &'a RunReport) -> Self {
        let r = &report.result;
        Self {
            schema_version: SCHEMA_VERSION,
            strategy: &r.strategy,
            params: &report.params,
            initial_cash: r.initial_cash,
            final_cash: r.final_cash,
            final_equity: r.final_equity,
            bars_processed: r.bars_processed,
            open_positions: r.open_positions.len(),
            stats: report.stats.as_ref(),
            diagnostics: &r.diagnostics,
        }
    }
}

pub fn export_summary_json(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(&RunSummary::of(report))
        .context("failed to serialize run summary to JSON")
}

// ─── Artifact bundle ────────────────────────────────────────────────

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output dir: {}", dir.display()))
}

fn write(path: PathBuf, contents: &str) -> Result<PathBuf> {
    std::fs::write(&path, contents)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Write `summary.json`, `trades.csv` and `equity.csv` into `output_dir`.
pub fn save_run_artifacts(report: &RunReport, output_dir: &Path) -> Result<Vec<PathBuf>> {
    ensure_dir(output_dir)?;
    Ok(vec![
        write(output_dir.join("summary.json"), &export_summary_json(report)?)?,
        write(
            output_dir.join("trades.csv"),
            &export_trades_csv(&report.result.trades)?,
        )?,
        write(
            output_dir.join("equity.csv"),
            &export_equity_csv(&report.result.equity_curve)?,
        )?,
    ])
}

/// Write `search.csv` into `output_dir`.
pub fn save_search_artifacts(report: &SearchReport, output_dir: &Path) -> Result<PathBuf> {
    ensure_dir(output_dir)?;
    write(output_dir.join("search.csv"), &export_search_csv(report)?)
}
