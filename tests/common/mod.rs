//! Common test utilities and fixtures

#![allow(dead_code)]

use std::collections::HashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use stock_poller::{
    Brokerage, ClientError, Fundamentals, Historical, HistoricalRecord, Instrument, Interval,
    OrderIntent, OrderResult, Position, Quote, Result, Side, Span,
};

/// Reference URL for a symbol on the fake brokerage
pub fn reference(symbol: &str) -> String {
    format!("https://api.test/instruments/{}/", symbol.to_ascii_lowercase())
}

/// Turn string literals into owned symbols
pub fn symbols(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Regular-session quote at the given bid/ask
pub fn quote(symbol: &str, bid: Decimal, ask: Decimal) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        instrument: reference(symbol),
        bid_price: bid,
        ask_price: ask,
        last_trade_price: Some(ask),
        last_extended_hours_trade_price: None,
        regular_session: true,
    }
}

/// Fundamentals carrying only a 52-week range
pub fn fundamentals(symbol: &str, low: Decimal, high: Decimal) -> Fundamentals {
    Fundamentals {
        instrument: reference(symbol),
        high_52_weeks: high,
        low_52_weeks: low,
        ..Default::default()
    }
}

/// Five-minute bars whose open/close points follow `closes`
pub fn historical(symbol: &str, closes: &[Decimal]) -> Historical {
    let start = Utc.with_ymd_and_hms(2024, 1, 12, 14, 30, 0).unwrap();
    let records = closes
        .windows(2)
        .enumerate()
        .map(|(i, pair)| HistoricalRecord {
            begins_at: start + chrono::Duration::minutes(5 * i as i64),
            open_price: pair[0],
            close_price: pair[1],
            high_price: pair[0].max(pair[1]),
            low_price: pair[0].min(pair[1]),
            volume: 100,
        })
        .collect();
    Historical {
        symbol: symbol.to_string(),
        interval: Interval::FiveMinute.to_string(),
        span: Span::Day.to_string(),
        records,
    }
}

#[derive(Debug, Default)]
struct Market {
    instruments: HashMap<String, Instrument>,
    quotes: HashMap<String, Quote>,
    fundamentals: HashMap<String, Fundamentals>,
    historicals: HashMap<String, Historical>,
    positions: HashMap<String, Position>,
    orders: Vec<(String, OrderIntent)>,
}

/// In-memory brokerage whose positions follow the orders it accepts
#[derive(Debug, Default)]
pub struct FakeBrokerage {
    market: Mutex<Market>,
    failing_quote_calls: Mutex<Range<usize>>,
    quote_calls: AtomicUsize,
    historical_calls: AtomicUsize,
}

impl FakeBrokerage {
    pub fn new() -> Self {
        Self::default()
    }

    /// List a symbol with a quote and a 52-week range
    pub fn list(&self, quote: Quote, fundamentals: Fundamentals) -> &Self {
        let mut market = self.market.lock().unwrap();
        let symbol = quote.symbol.clone();
        market
            .instruments
            .insert(symbol.clone(), Instrument::new(&symbol, reference(&symbol)));
        market.fundamentals.insert(symbol.clone(), fundamentals);
        market.quotes.insert(symbol, quote);
        self
    }

    pub fn hold(&self, symbol: &str, quantity: u64, average_buy_price: Decimal) -> &Self {
        let mut market = self.market.lock().unwrap();
        market.positions.insert(
            reference(symbol),
            Position {
                instrument: reference(symbol),
                quantity,
                average_buy_price,
                created_at: Utc::now(),
            },
        );
        self
    }

    pub fn set_historical(&self, historical: Historical) -> &Self {
        let mut market = self.market.lock().unwrap();
        market
            .historicals
            .insert(historical.symbol.clone(), historical);
        self
    }

    pub fn set_quote(&self, quote: Quote) {
        let mut market = self.market.lock().unwrap();
        market.quotes.insert(quote.symbol.clone(), quote);
    }

    /// Quote requests whose zero-based call index falls in `calls` fail
    /// with a rate limit
    pub fn fail_quotes(&self, calls: Range<usize>) {
        *self.failing_quote_calls.lock().unwrap() = calls;
    }

    pub fn orders(&self) -> Vec<(String, OrderIntent)> {
        self.market.lock().unwrap().orders.clone()
    }

    pub fn position(&self, symbol: &str) -> Option<Position> {
        self.market
            .lock()
            .unwrap()
            .positions
            .get(&reference(symbol))
            .cloned()
    }

    pub fn quote_calls(&self) -> usize {
        self.quote_calls.load(Ordering::SeqCst)
    }

    pub fn historical_calls(&self) -> usize {
        self.historical_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Brokerage for FakeBrokerage {
    async fn get_positions(&self) -> Result<Vec<Position>> {
        let market = self.market.lock().unwrap();
        Ok(market
            .positions
            .values()
            .filter(|p| p.quantity > 0)
            .cloned()
            .collect())
    }

    async fn get_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>> {
        let call = self.quote_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_quote_calls.lock().unwrap().contains(&call) {
            return Err(ClientError::RateLimit {
                message: "slow down".to_string(),
                retry_after_seconds: Some(1),
            });
        }
        let market = self.market.lock().unwrap();
        Ok(symbols
            .iter()
            .filter_map(|s| market.quotes.get(s).cloned())
            .collect())
    }

    async fn get_fundamentals(&self, symbols: &[String]) -> Result<Vec<Fundamentals>> {
        assert!(symbols.len() <= stock_poller::common::traits::MAX_FUNDAMENTALS_BATCH);
        let market = self.market.lock().unwrap();
        Ok(symbols
            .iter()
            .filter_map(|s| market.fundamentals.get(s).cloned())
            .collect())
    }

    async fn get_instrument(&self, symbol: &str) -> Result<Instrument> {
        let market = self.market.lock().unwrap();
        market
            .instruments
            .get(symbol)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("instrument {}", symbol)))
    }

    async fn get_instrument_by_reference(&self, reference: &str) -> Result<Instrument> {
        let market = self.market.lock().unwrap();
        market
            .instruments
            .values()
            .find(|i| i.url == reference)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(reference.to_string()))
    }

    async fn get_historical(
        &self,
        _interval: Interval,
        _span: Span,
        symbol: &str,
    ) -> Result<Historical> {
        self.historical_calls.fetch_add(1, Ordering::SeqCst);
        let market = self.market.lock().unwrap();
        market
            .historicals
            .get(symbol)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("historicals for {}", symbol)))
    }

    async fn submit_order(
        &self,
        instrument_ref: &str,
        symbol: &str,
        intent: OrderIntent,
    ) -> Result<OrderResult> {
        let mut market = self.market.lock().unwrap();
        market.orders.push((symbol.to_string(), intent));

        let position = market
            .positions
            .entry(instrument_ref.to_string())
            .or_insert_with(|| Position {
                instrument: instrument_ref.to_string(),
                quantity: 0,
                average_buy_price: Decimal::ZERO,
                created_at: Utc::now(),
            });
        match intent.side {
            Side::Buy => {
                let cost = position.average_buy_price * Decimal::from(position.quantity)
                    + intent.price * Decimal::from(intent.quantity);
                position.quantity += intent.quantity;
                if position.quantity > 0 {
                    position.average_buy_price = cost / Decimal::from(position.quantity);
                }
            }
            Side::Sell => {
                position.quantity = position.quantity.saturating_sub(intent.quantity);
            }
        }

        Ok(OrderResult {
            id: format!("order-{}", market.orders.len()),
            state: "confirmed".to_string(),
            symbol: symbol.to_string(),
            side: intent.side,
            price: intent.price,
            quantity: intent.quantity,
        })
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
