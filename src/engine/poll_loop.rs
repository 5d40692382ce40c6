//! Repeated refresh → strategy → execute cycles

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::throttle::{ExecutionReport, LimitExceeded, TradeExecutor, TradeLimits};
use crate::common::errors::{ClientError, Result};
use crate::common::shutdown::Shutdown;
use crate::common::traits::Brokerage;
use crate::config::types::{CapAction, TradingConfig};
use crate::snapshot::{SnapshotBuilder, SnapshotSet};
use crate::strategy::{Strategy, StrategyContext};

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Initializing,
    Polling,
    Stopped,
}

/// Why a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A run-wide cap was hit under the stop policy
    LimitReached(LimitExceeded),
    /// Both budgets are spent under the skip policy
    BudgetExhausted,
    /// A cycle proposed nothing and quiescence ends the run
    Quiescent,
    /// Shutdown was requested
    Cancelled,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::LimitReached(limit) => write!(f, "{}", limit),
            StopReason::BudgetExhausted => write!(f, "buy and sale budgets exhausted"),
            StopReason::Quiescent => write!(f, "no trades proposed"),
            StopReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Totals for a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Polling iterations started, including failed ones
    pub polls: u64,
    pub total_buys: u32,
    pub total_sales: u32,
    pub failed_orders: usize,
    pub stop: StopReason,
}

/// Timing and termination settings for the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub min_poll: Duration,
    pub max_poll: Duration,
    pub stop_on_quiescence: bool,
    pub initial_build_timeout: Duration,
}

impl From<&TradingConfig> for PollSettings {
    fn from(config: &TradingConfig) -> Self {
        Self {
            min_poll: config.min_poll(),
            max_poll: config.max_poll(),
            stop_on_quiescence: config.stop_on_quiescence,
            initial_build_timeout: config.initial_build_timeout(),
        }
    }
}

impl PollSettings {
    /// Wait before the next cycle
    ///
    /// Always `min_poll`; after a completed cycle also whatever is left of
    /// the `max_poll - min_poll` window once that cycle's own duration is
    /// taken out.
    pub fn wait(&self, last_cycle: Option<Duration>) -> Duration {
        let window = self.max_poll.saturating_sub(self.min_poll);
        let extra = last_cycle.map_or(Duration::ZERO, |d| window.saturating_sub(d));
        self.min_poll + extra
    }
}

/// Result of one polling iteration
enum Cycle {
    Continue,
    Stop(StopReason),
}

/// Drives the whole run; the only holder of cross-cycle state
pub struct PollLoop {
    brokerage: Arc<dyn Brokerage>,
    builder: SnapshotBuilder,
    strategy: Strategy,
    executor: TradeExecutor,
    settings: PollSettings,
    shutdown: Shutdown,
    state: RunState,
    polls: u64,
    failed_orders: usize,
}

impl PollLoop {
    pub fn new(
        brokerage: Arc<dyn Brokerage>,
        strategy: Strategy,
        executor: TradeExecutor,
        settings: PollSettings,
        shutdown: Shutdown,
    ) -> Self {
        let builder = SnapshotBuilder::new(brokerage.clone(), shutdown.clone());
        Self {
            brokerage,
            builder,
            strategy,
            executor,
            settings,
            shutdown,
            state: RunState::Initializing,
            polls: 0,
            failed_orders: 0,
        }
    }

    /// Wire a loop from the trading configuration
    pub fn from_config(
        brokerage: Arc<dyn Brokerage>,
        config: &TradingConfig,
        shutdown: Shutdown,
    ) -> Self {
        Self::new(
            brokerage,
            Strategy::from_config(config),
            TradeExecutor::new(TradeLimits::from(config), config.dry_run),
            PollSettings::from(config),
            shutdown,
        )
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn executor(&self) -> &TradeExecutor {
        &self.executor
    }

    /// Poll until a stop condition
    ///
    /// Errors only when the initial build fails.
    pub async fn run(&mut self, symbols: &[String]) -> Result<RunSummary> {
        self.state = RunState::Initializing;
        info!(
            strategy = self.strategy.name(),
            brokerage = self.brokerage.name(),
            symbols = symbols.len(),
            dry_run = self.executor.is_dry_run(),
            "Building initial snapshots"
        );

        let initial = match self.initial_build(symbols).await {
            Ok(set) => set,
            Err(ClientError::Cancelled) => return Ok(self.finish(StopReason::Cancelled)),
            Err(e) => {
                self.state = RunState::Stopped;
                return Err(e);
            }
        };
        info!(
            instruments = initial.len(),
            held = initial.held_count(),
            "Initial snapshots ready"
        );

        self.state = RunState::Polling;
        let mut current = initial;
        let mut last_cycle: Option<Duration> = None;

        loop {
            let wait = self.settings.wait(last_cycle);
            debug!(wait_ms = wait.as_millis() as u64, "Sleeping until next poll");
            if !self.shutdown.sleep(wait).await {
                return Ok(self.finish(StopReason::Cancelled));
            }

            let first = self.polls == 0;
            self.polls += 1;
            let started = Instant::now();

            match self.cycle(&mut current, first).await {
                Ok(Cycle::Continue) => {}
                Ok(Cycle::Stop(reason)) => return Ok(self.finish(reason)),
                Err(ClientError::Cancelled) => return Ok(self.finish(StopReason::Cancelled)),
                Err(e) => {
                    self.state = RunState::Stopped;
                    return Err(e);
                }
            }

            last_cycle = Some(started.elapsed());
        }
    }

    async fn initial_build(&self, symbols: &[String]) -> Result<SnapshotSet> {
        match tokio::time::timeout(self.settings.initial_build_timeout, self.builder.build(symbols))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout(format!(
                "initial snapshot build exceeded {:?}",
                self.settings.initial_build_timeout
            ))),
        }
    }

    /// One iteration. Past the initial build only cancellation ends the
    /// run; any other failure is logged and the cycle retried.
    async fn cycle(&mut self, current: &mut SnapshotSet, first: bool) -> Result<Cycle> {
        if !first {
            match self.builder.refresh(current).await {
                Ok(refreshed) => *current = refreshed,
                Err(ClientError::Cancelled) => return Err(ClientError::Cancelled),
                Err(e) if e.is_transient() => {
                    warn!(poll = self.polls, "Refresh failed, keeping previous snapshots: {}", e);
                    return Ok(Cycle::Continue);
                }
                Err(e) => {
                    error!(poll = self.polls, "Refresh failed, keeping previous snapshots: {}", e);
                    return Ok(Cycle::Continue);
                }
            }
        }

        let ctx = StrategyContext::new(self.brokerage.as_ref(), &self.shutdown);
        let trades = match self.strategy.trades(current.as_slice(), &ctx).await {
            Ok(trades) => trades,
            Err(ClientError::Cancelled) => return Err(ClientError::Cancelled),
            Err(e) if e.is_transient() => {
                warn!(poll = self.polls, strategy = self.strategy.name(), "Strategy failed: {}", e);
                return Ok(Cycle::Continue);
            }
            Err(e) => {
                error!(poll = self.polls, strategy = self.strategy.name(), "Strategy failed: {}", e);
                return Ok(Cycle::Continue);
            }
        };

        debug!(poll = self.polls, proposed = trades.len(), "Strategy finished");
        if trades.is_empty() && self.settings.stop_on_quiescence {
            return Ok(Cycle::Stop(StopReason::Quiescent));
        }

        let report = self
            .executor
            .apply(trades, self.brokerage.as_ref(), &self.shutdown)
            .await?;
        self.record(&report);

        if let Some(limit) = report.stop {
            return Ok(Cycle::Stop(StopReason::LimitReached(limit)));
        }
        if self.executor.limits().policy.on_total_cap == CapAction::Skip
            && self.executor.budgets_exhausted()
        {
            return Ok(Cycle::Stop(StopReason::BudgetExhausted));
        }
        Ok(Cycle::Continue)
    }

    fn record(&mut self, report: &ExecutionReport) {
        self.failed_orders += report.failed;
        if report.failed > 0 {
            error!(poll = self.polls, failed = report.failed, "Some orders failed");
        }
        info!(
            poll = self.polls,
            submitted = report.submitted.len(),
            discarded = report.discarded,
            total_buys = self.executor.total_buys(),
            total_sales = self.executor.total_sales(),
            "Cycle complete"
        );
    }

    fn finish(&mut self, stop: StopReason) -> RunSummary {
        self.state = RunState::Stopped;
        info!(polls = self.polls, "Polling stopped: {}", stop);
        RunSummary {
            polls: self.polls,
            total_buys: self.executor.total_buys(),
            total_sales: self.executor.total_sales(),
            failed_orders: self.failed_orders,
            stop,
        }
    }
}
