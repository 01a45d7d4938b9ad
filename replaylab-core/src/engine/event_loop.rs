//! Bar-by-bar simulation clock.
//!
//! Per reference timestamp: snapshot every instrument that printed, hand the
//! snapshot to the strategy, apply its intents one by one in the order
//! returned, then sample equity. Each bar is processed exactly once, in
//! ascending order, on the calling thread.

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::data::{DataError, DataProvider, MarketData};
use crate::ledger::Ledger;
use crate::params::{ParamSet, ParamSetExt};
use crate::strategy::{Snapshot, Strategy};

use super::context::{ScratchState, StrategyContext};
use super::execution::execute;
use super::state::{EngineConfig, EngineError, RunDiagnostics, RunResult, RunState};

/// A configured universe over a fixed window, ready to run strategies.
///
/// Holds no per-run state, so one backtester can serve many runs, including
/// concurrent ones from a parallel search.
#[derive(Debug, Clone)]
pub struct Backtester {
    config: EngineConfig,
    market: MarketData,
    clock: Vec<NaiveDateTime>,
}

impl Backtester {
    /// Validate `config` and cut `market` down to its universe and window.
    pub fn new(config: EngineConfig, market: &MarketData) -> Result<Self, EngineError> {
        config.validate()?;
        if let Some(missing) = config.symbols.iter().find(|s| !market.contains(s)) {
            return Err(EngineError::UnknownInstrument {
                symbol: missing.clone(),
            });
        }
        let (start, end) = config.window();
        let market = market.select(&config.symbols, start, end)?;
        let clock = market.clock();
        debug!(
            reference = config.reference_symbol().unwrap_or_default(),
            bars = clock.len(),
            "backtester ready"
        );
        Ok(Self {
            config,
            market,
            clock,
        })
    }

    /// Load the universe from `provider`, then build as [`Backtester::new`].
    pub fn from_provider(
        config: EngineConfig,
        provider: &dyn DataProvider,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let market = MarketData::load(
            provider,
            &config.symbols,
            config.start_date,
            config.end_date,
            config.resolution,
        )
        .map_err(|err| match err {
            DataError::SymbolNotFound { symbol } => EngineError::UnknownInstrument { symbol },
            other => EngineError::Data(other),
        })?;
        Self::new(config, &market)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn market(&self) -> &MarketData {
        &self.market
    }

    /// Reference timestamps the clock will visit.
    pub fn clock(&self) -> &[NaiveDateTime] {
        &self.clock
    }

    /// A fresh, idle run of `strategy` with `params`.
    pub fn session<'a>(&'a self, strategy: &'a dyn Strategy, params: &'a ParamSet) -> Session<'a> {
        Session {
            engine: self,
            strategy,
            params,
            ledger: Ledger::new(self.config.initial_cash),
            scratch: ScratchState::new(),
            diagnostics: RunDiagnostics::default(),
            cursor: 0,
            state: RunState::Idle,
        }
    }

    /// Run `strategy` over every bar and return the result.
    pub fn run(&self, strategy: &dyn Strategy, params: &ParamSet) -> Result<RunResult, EngineError> {
        let mut session = self.session(strategy, params);
        session.run_to_end()?;
        Ok(session.finish())
    }
}

/// One run in progress: ledger, scratch state and clock position.
pub struct Session<'a> {
    engine: &'a Backtester,
    strategy: &'a dyn Strategy,
    params: &'a ParamSet,
    ledger: Ledger,
    scratch: ScratchState,
    diagnostics: RunDiagnostics,
    cursor: usize,
    state: RunState,
}

impl<'a> Session<'a> {
    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn diagnostics(&self) -> &RunDiagnostics {
        &self.diagnostics
    }

    /// Bars processed so far.
    pub fn bars_processed(&self) -> usize {
        self.cursor
    }

    fn snapshot_at(&self, timestamp: NaiveDateTime) -> Snapshot {
        let market = &self.engine.market;
        let mut snapshot = Snapshot::new(timestamp);
        for symbol in market.symbols() {
            if let Some(bar) = market.series(symbol).and_then(|s| s.at(timestamp)) {
                snapshot.bars.insert(symbol.clone(), *bar);
            }
        }
        snapshot
    }

    /// Process the next bar. Returns `Ok(false)` once the clock is exhausted.
    pub fn step(&mut self) -> Result<bool, EngineError> {
        match self.state {
            RunState::Complete => return Ok(false),
            RunState::Idle => {
                info!(
                    strategy = self.strategy.name(),
                    params = %self.params.canonical_key(),
                    bars = self.engine.clock.len(),
                    "backtest started"
                );
                self.state = RunState::Running;
            }
            RunState::Running => {}
        }

        let Some(&timestamp) = self.engine.clock.get(self.cursor) else {
            self.complete();
            return Ok(false);
        };

        let snapshot = self.snapshot_at(timestamp);
        let orders = {
            let mut ctx = StrategyContext::new(
                &mut self.ledger,
                &self.engine.market,
                &mut self.scratch,
                timestamp,
                self.cursor,
            );
            self.strategy.on_bar(&mut ctx, &snapshot, self.params)
        };

        for order in orders {
            if !self.engine.market.contains(&order.symbol) {
                return Err(EngineError::UnknownInstrument {
                    symbol: order.symbol,
                });
            }
            let bar = snapshot.get(&order.symbol);
            let outcome = execute(&mut self.ledger, order, bar, timestamp);
            self.diagnostics.record(&outcome);
        }

        self.ledger.mark_to_market(timestamp, &snapshot.bars);
        self.cursor += 1;
        if self.cursor == self.engine.clock.len() {
            self.complete();
        }
        Ok(true)
    }

    fn complete(&mut self) {
        if self.state == RunState::Complete {
            return;
        }
        self.state = RunState::Complete;
        info!(
            strategy = self.strategy.name(),
            bars = self.cursor,
            trades = self.ledger.trades().len(),
            open_positions = self.ledger.open_positions_count(),
            final_equity = self.ledger.final_equity(),
            ignored = self.diagnostics.ignored_total(),
            "backtest complete"
        );
    }

    /// Step until the clock is exhausted.
    pub fn run_to_end(&mut self) -> Result<(), EngineError> {
        while self.step()? {}
        Ok(())
    }

    /// Hand over everything recorded so far.
    pub fn finish(self) -> RunResult {
        let final_equity = self.ledger.final_equity();
        let initial_cash = self.ledger.initial_cash();
        let parts = self.ledger.into_parts();
        RunResult {
            strategy: self.strategy.name().to_string(),
            initial_cash,
            final_cash: parts.cash,
            final_equity,
            bars_processed: self.cursor,
            trades: parts.trades,
            equity_curve: parts.equity_curve,
            open_positions: parts.open_positions,
            diagnostics: self.diagnostics,
        }
    }
}
