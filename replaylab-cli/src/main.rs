//! ReplayLab CLI: run, optimize and synth commands.
//!
//! Commands:
//! - `run`: one backtest from a TOML experiment file
//! - `optimize`: grid search or coordinate descent per the `[optimize]` section
//! - `synth`: write seeded random-walk bars as CSV for the csv data source

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use replaylab_core::data::{write_bars_csv, DataProvider, Resolution, SyntheticProvider};
use replaylab_runner::export::{save_run_artifacts, save_search_artifacts};
use replaylab_runner::{
    build_backtester, optimize_with, run_with, ExperimentConfig, ParamSetExt, RunReport,
    SearchReport,
};

#[derive(Parser)]
#[command(name = "replaylab", about = "ReplayLab: event-driven backtesting and parameter search")]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one backtest and print its statistics.
    Run {
        /// Path to a TOML experiment file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for summary.json, trades.csv and equity.csv.
        #[arg(long, default_value = "results")]
        out: PathBuf,
    },
    /// Search the `[optimize.grid]` parameter space.
    Optimize {
        /// Path to a TOML experiment file with an [optimize] section.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for search.csv.
        #[arg(long, default_value = "results")]
        out: PathBuf,

        /// Rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Write synthetic bars as `<SYMBOL>.csv`.
    Synth {
        /// Symbols to generate (e.g., SPY QQQ).
        #[arg(long = "symbol", required = true, num_args = 1..)]
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        start: NaiveDate,

        /// End date (YYYY-MM-DD), exclusive.
        #[arg(long)]
        end: NaiveDate,

        /// minute, hour or daily.
        #[arg(long, default_value = "minute")]
        resolution: Resolution,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output directory.
        #[arg(long, default_value = "data")]
        out: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { config, out } => run_cmd(&config, &out),
        Commands::Optimize { config, out, top } => optimize_cmd(&config, &out, top),
        Commands::Synth {
            symbols,
            start,
            end,
            resolution,
            seed,
            out,
        } => synth_cmd(&symbols, start, end, resolution, seed, &out),
    }
}

fn load_config(path: &Path) -> Result<ExperimentConfig> {
    ExperimentConfig::load(path).with_context(|| format!("loading {}", path.display()))
}

fn run_cmd(config_path: &Path, out: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let backtester = build_backtester(&config)?;
    let report = run_with(&backtester, &config)?;

    print_summary(&report);

    let written = save_run_artifacts(&report, out)?;
    for path in written {
        info!(path = %path.display(), "artifact written");
    }
    println!("Artifacts saved to: {}", out.display());
    Ok(())
}

fn optimize_cmd(config_path: &Path, out: &Path, top: usize) -> Result<()> {
    let config = load_config(config_path)?;
    let backtester = build_backtester(&config)?;
    let report = optimize_with(&backtester, &config)?;

    print_search(&report, top);

    let path = save_search_artifacts(&report, out)?;
    println!("Search results saved to: {}", path.display());
    Ok(())
}

fn synth_cmd(
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
    resolution: Resolution,
    seed: u64,
    out: &Path,
) -> Result<()> {
    anyhow::ensure!(start < end, "--start {start} must be before --end {end}");
    std::fs::create_dir_all(out)
        .with_context(|| format!("failed to create output dir: {}", out.display()))?;

    let provider = SyntheticProvider::new(seed);
    for symbol in symbols {
        let bars = provider.history(symbol, start, end, resolution)?;
        let path = out.join(format!("{symbol}.csv"));
        write_bars_csv(&path, &bars)?;
        println!("{symbol}: {} bars -> {}", bars.len(), path.display());
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    let r = &report.result;
    println!();
    println!("=== Backtest Result ===");
    println!("Strategy:       {}", r.strategy);
    if !report.params.is_empty() {
        println!("Params:         {}", report.params.canonical_key());
    }
    println!("Bars:           {}", r.bars_processed);
    println!("Final Equity:   {:.2}", r.final_equity);
    println!("Open Positions: {}", r.open_positions.len());
    println!(
        "Intents:        {} ({} opened, {} closed, {} ignored)",
        r.diagnostics.intents,
        r.diagnostics.opened,
        r.diagnostics.closed,
        r.diagnostics.ignored_total()
    );
    println!();
    match &report.stats {
        Some(stats) => println!("{}", stats.summary_table()),
        None => println!("No trades executed."),
    }
}

fn print_search(report: &SearchReport, top: usize) {
    println!();
    println!(
        "=== {} by {} ({} simulations, {} passes{}) ===",
        report.method,
        report.metric,
        report.simulations,
        report.passes,
        if report.converged { ", converged" } else { "" }
    );
    for (rank, entry) in report.top(top).iter().enumerate() {
        let score = entry
            .score
            .map(|s| format!("{s:>12.4}"))
            .unwrap_or_else(|| format!("{:>12}", "no trades"));
        println!("{:>3}. {score}  {}", rank + 1, entry.params.canonical_key());
    }
}
