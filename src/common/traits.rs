//! Trait definitions for the brokerage collaborator

use async_trait::async_trait;

use super::errors::Result;
use super::types::{
    Fundamentals, Historical, Instrument, Interval, OrderIntent, OrderResult, Position, Quote,
    Span,
};

/// Most symbols a single fundamentals request may carry
pub const MAX_FUNDAMENTALS_BATCH: usize = 100;

/// Trait for brokerage/market-data clients
///
/// Every method is a remote call that may fail or be rate limited. The
/// trading core only talks to this trait, never to a concrete client.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Brokerage: Send + Sync {
    /// Current open positions
    async fn get_positions(&self) -> Result<Vec<Position>>;

    /// Latest quotes for all symbols in a single batched call
    async fn get_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>>;

    /// Fundamentals for at most [`MAX_FUNDAMENTALS_BATCH`] symbols
    async fn get_fundamentals(&self, symbols: &[String]) -> Result<Vec<Fundamentals>>;

    /// Resolve a ticker symbol to an instrument
    async fn get_instrument(&self, symbol: &str) -> Result<Instrument>;

    /// Re-fetch an instrument from its stable reference
    async fn get_instrument_by_reference(&self, reference: &str) -> Result<Instrument>;

    /// Historical bars for one symbol
    async fn get_historical(
        &self,
        interval: Interval,
        span: Span,
        symbol: &str,
    ) -> Result<Historical>;

    /// Submit a limit order
    async fn submit_order(
        &self,
        instrument_ref: &str,
        symbol: &str,
        intent: OrderIntent,
    ) -> Result<OrderResult>;

    /// Name of the brokerage, for logs
    fn name(&self) -> &'static str;
}
