//! Engine module - trade throttling and the polling loop

pub mod poll_loop;
pub mod throttle;

pub use poll_loop::{PollLoop, PollSettings, RunState, RunSummary, StopReason};
pub use throttle::{ExecutionReport, LimitExceeded, TradeExecutor, TradeLimits};
