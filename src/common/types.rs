//! Unified types shared by the brokerage client, snapshots and strategies

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// A tradable security
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Ticker symbol, unique within the universe
    pub symbol: String,
    /// Stable reference (URL) used to re-fetch this instrument
    pub url: String,
    /// Brokerage identifier
    #[serde(default)]
    pub id: String,
    /// Human-readable name
    #[serde(default)]
    pub name: String,
    /// Whether the brokerage accepts orders for it
    #[serde(default)]
    pub tradeable: bool,
}

impl Instrument {
    /// Create an instrument with only a symbol and reference
    pub fn new(symbol: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            url: url.into(),
            tradeable: true,
            ..Default::default()
        }
    }
}

/// Latest quote for an instrument
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    /// Reference of the instrument this quote belongs to
    pub instrument: String,
    pub bid_price: Decimal,
    pub ask_price: Decimal,
    /// Last trade during the regular session
    pub last_trade_price: Option<Decimal>,
    /// Last trade during pre/post market
    pub last_extended_hours_trade_price: Option<Decimal>,
    /// Whether regular-session trading was active when the quote was taken
    pub regular_session: bool,
}

impl Quote {
    /// Price that reflects the market right now, even outside regular hours
    pub fn effective_price(&self) -> Option<Decimal> {
        if self.regular_session {
            self.last_trade_price
                .or(self.last_extended_hours_trade_price)
        } else {
            self.last_extended_hours_trade_price
                .or(self.last_trade_price)
        }
    }
}

/// Slow-moving fundamental data for an instrument
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    /// Reference of the instrument these fundamentals belong to
    pub instrument: String,
    /// Zero when the brokerage did not report one
    pub high_52_weeks: Decimal,
    /// Zero when the brokerage did not report one
    pub low_52_weeks: Decimal,
    pub average_volume: Option<Decimal>,
    pub market_cap: Option<Decimal>,
    pub dividend_yield: Option<Decimal>,
}

/// An open position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Reference of the held instrument
    pub instrument: String,
    /// Whole shares held
    pub quantity: u64,
    /// Average cost basis per share
    pub average_buy_price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A single OHLC bar
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub begins_at: DateTime<Utc>,
    pub open_price: Decimal,
    pub close_price: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub volume: u64,
}

/// Chronological price bars for one symbol
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Historical {
    pub symbol: String,
    pub interval: String,
    pub span: String,
    pub records: Vec<HistoricalRecord>,
}

impl Historical {
    /// Open and close prices interleaved, oldest first
    pub fn price_points(&self) -> Vec<Decimal> {
        self.records
            .iter()
            .flat_map(|r| [r.open_price, r.close_price])
            .collect()
    }
}

/// Bar width for historical queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    FiveMinute,
    TenMinute,
    ThirtyMinute,
    Hour,
    Day,
    Week,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::FiveMinute => "5minute",
            Interval::TenMinute => "10minute",
            Interval::ThirtyMinute => "30minute",
            Interval::Hour => "hour",
            Interval::Day => "day",
            Interval::Week => "week",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time covered by a historical query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Span {
    Day,
    Week,
    Month,
    Year,
    FiveYear,
}

impl Span {
    pub fn as_str(&self) -> &'static str {
        match self {
            Span::Day => "day",
            Span::Week => "week",
            Span::Month => "month",
            Span::Year => "year",
            Span::FiveYear => "5year",
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a strategy wants to do with an instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub side: Side,
    /// Limit price per share
    pub price: Decimal,
    /// Whole shares
    pub quantity: u64,
}

impl OrderIntent {
    pub fn buy(price: Decimal, quantity: u64) -> Self {
        Self {
            side: Side::Buy,
            price,
            quantity,
        }
    }

    pub fn sell(price: Decimal, quantity: u64) -> Self {
        Self {
            side: Side::Sell,
            price,
            quantity,
        }
    }
}

/// Brokerage acknowledgement of a submitted order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub id: String,
    pub state: String,
    pub symbol: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: u64,
}
