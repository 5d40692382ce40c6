use crate::common::shutdown::Shutdown;
use crate::common::traits::Brokerage;
use crate::common::types::{Instrument, OrderIntent, Side};

/// A proposed order, not yet submitted
///
/// Produced by a strategy and consumed exactly once by the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub instrument: Instrument,
    pub order: OrderIntent,
    /// Human-readable explanation, logged with the order
    pub reason: String,
}

impl Trade {
    pub fn new(instrument: Instrument, order: OrderIntent, reason: impl Into<String>) -> Self {
        Self {
            instrument,
            order,
            reason: reason.into(),
        }
    }

    pub fn side(&self) -> Side {
        self.order.side
    }

    pub fn symbol(&self) -> &str {
        &self.instrument.symbol
    }

    pub fn is_buy(&self) -> bool {
        self.order.side == Side::Buy
    }
}

/// Context provided to strategies by the poll loop
///
/// Strategies are pure over their snapshots; the brokerage is only
/// reachable here for historical backfill.
#[derive(Clone, Copy)]
pub struct StrategyContext<'a> {
    pub brokerage: &'a dyn Brokerage,
    pub shutdown: &'a Shutdown,
}

impl<'a> StrategyContext<'a> {
    pub fn new(brokerage: &'a dyn Brokerage, shutdown: &'a Shutdown) -> Self {
        Self {
            brokerage,
            shutdown,
        }
    }
}
