//! StockPoller Library
//!
//! Polls a brokerage for positions, quotes and fundamentals, runs a
//! trading strategy over the result every cycle, and submits the
//! proposed orders under run-wide and per-cycle buy/sell caps.

pub mod brokerage;
pub mod common;
pub mod config;
pub mod engine;
pub mod snapshot;
pub mod strategy;
pub mod universe;

// Re-export commonly used types
pub use brokerage::BrokerageRestClient;
pub use common::errors::{ClientError, Result};
pub use common::shutdown::{Shutdown, ShutdownTrigger};
pub use common::traits::Brokerage;
pub use common::types::{
    Fundamentals, Historical, HistoricalRecord, Instrument, Interval, OrderIntent, OrderResult,
    Position, Quote, Side, Span,
};
pub use config::types::AppConfig;
pub use engine::{
    ExecutionReport, LimitExceeded, PollLoop, PollSettings, RunState, RunSummary, StopReason,
    TradeExecutor, TradeLimits,
};
pub use snapshot::{Snapshot, SnapshotBuilder, SnapshotSet};

// Strategy types
pub use strategy::{Strategy, StrategyContext, StrategyKind, Trade};
