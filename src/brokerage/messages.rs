//! Brokerage REST wire types
//!
//! The API encodes every number as a string and uses `null` liberally, so
//! these types stay close to the wire and are converted into the shared
//! types in `common::types` before anything else sees them.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::errors::{ClientError, Result};
use crate::common::market_hours::is_regular_session;
use crate::common::types::{
    Fundamentals, Historical, HistoricalRecord, Instrument, OrderIntent, OrderResult, Position,
    Quote, Side,
};

/// Parse a string-encoded decimal field
pub fn parse_decimal(field: &str, value: &str) -> Result<Decimal> {
    Decimal::from_str(value.trim())
        .map_err(|e| ClientError::InvalidResponse(format!("Invalid {}: {:?} ({})", field, value, e)))
}

/// Parse an optional string-encoded decimal field
pub fn parse_optional_decimal(field: &str, value: Option<&str>) -> Result<Option<Decimal>> {
    match value {
        Some(v) if !v.trim().is_empty() => parse_decimal(field, v).map(Some),
        _ => Ok(None),
    }
}

/// Parse a string-encoded share count into whole shares
pub fn parse_shares(field: &str, value: &str) -> Result<u64> {
    let quantity = parse_decimal(field, value)?;
    quantity
        .trunc()
        .to_u64()
        .ok_or_else(|| ClientError::InvalidResponse(format!("Invalid {}: {:?}", field, value)))
}

/// Generic paginated list envelope
#[derive(Debug, Clone, Deserialize)]
pub struct Paginated<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
}

/// OAuth token response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Account record; orders must reference one
#[derive(Debug, Clone, Deserialize)]
pub struct AccountResponse {
    pub url: String,
    #[serde(default)]
    pub account_number: Option<String>,
}

/// Position record
#[derive(Debug, Clone, Deserialize)]
pub struct PositionResponse {
    pub instrument: String,
    pub quantity: String,
    pub average_buy_price: String,
    pub created_at: DateTime<Utc>,
}

impl PositionResponse {
    pub fn into_position(self) -> Result<Position> {
        Ok(Position {
            quantity: parse_shares("position quantity", &self.quantity)?,
            average_buy_price: parse_decimal("average buy price", &self.average_buy_price)?,
            created_at: self.created_at,
            instrument: self.instrument,
        })
    }
}

/// Quote record
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteResponse {
    pub symbol: String,
    pub instrument: String,
    #[serde(default)]
    pub ask_price: Option<String>,
    #[serde(default)]
    pub bid_price: Option<String>,
    #[serde(default)]
    pub last_trade_price: Option<String>,
    #[serde(default)]
    pub last_extended_hours_trade_price: Option<String>,
    #[serde(default)]
    pub trading_halted: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl QuoteResponse {
    pub fn into_quote(self) -> Result<Quote> {
        let taken_at = self.updated_at.unwrap_or_else(Utc::now);
        Ok(Quote {
            bid_price: parse_optional_decimal("bid price", self.bid_price.as_deref())?
                .unwrap_or_default(),
            ask_price: parse_optional_decimal("ask price", self.ask_price.as_deref())?
                .unwrap_or_default(),
            last_trade_price: parse_optional_decimal(
                "last trade price",
                self.last_trade_price.as_deref(),
            )?,
            last_extended_hours_trade_price: parse_optional_decimal(
                "extended hours price",
                self.last_extended_hours_trade_price.as_deref(),
            )?,
            regular_session: !self.trading_halted && is_regular_session(taken_at),
            symbol: self.symbol,
            instrument: self.instrument,
        })
    }
}

/// Fundamentals record
#[derive(Debug, Clone, Deserialize)]
pub struct FundamentalsResponse {
    pub instrument: String,
    #[serde(default)]
    pub high_52_weeks: Option<String>,
    #[serde(default)]
    pub low_52_weeks: Option<String>,
    #[serde(default)]
    pub average_volume: Option<String>,
    #[serde(default)]
    pub market_cap: Option<String>,
    #[serde(default)]
    pub dividend_yield: Option<String>,
}

impl FundamentalsResponse {
    pub fn into_fundamentals(self) -> Result<Fundamentals> {
        Ok(Fundamentals {
            high_52_weeks: parse_optional_decimal("52-week high", self.high_52_weeks.as_deref())?
                .unwrap_or_default(),
            low_52_weeks: parse_optional_decimal("52-week low", self.low_52_weeks.as_deref())?
                .unwrap_or_default(),
            average_volume: parse_optional_decimal(
                "average volume",
                self.average_volume.as_deref(),
            )?,
            market_cap: parse_optional_decimal("market cap", self.market_cap.as_deref())?,
            dividend_yield: parse_optional_decimal(
                "dividend yield",
                self.dividend_yield.as_deref(),
            )?,
            instrument: self.instrument,
        })
    }
}

/// Instrument record
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentResponse {
    pub id: String,
    pub url: String,
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tradeable: bool,
}

impl From<InstrumentResponse> for Instrument {
    fn from(response: InstrumentResponse) -> Self {
        Instrument {
            symbol: response.symbol,
            url: response.url,
            id: response.id,
            name: response.name.unwrap_or_default(),
            tradeable: response.tradeable,
        }
    }
}

/// Historicals list envelope
#[derive(Debug, Clone, Deserialize)]
pub struct HistoricalsResponse {
    #[serde(default)]
    pub results: Vec<Option<HistoricalResponse>>,
}

/// Bars for one symbol
#[derive(Debug, Clone, Deserialize)]
pub struct HistoricalResponse {
    pub symbol: String,
    #[serde(default)]
    pub interval: String,
    #[serde(default)]
    pub span: String,
    #[serde(default)]
    pub historicals: Vec<HistoricalRecordResponse>,
}

/// A single bar
#[derive(Debug, Clone, Deserialize)]
pub struct HistoricalRecordResponse {
    pub begins_at: DateTime<Utc>,
    pub open_price: String,
    pub close_price: String,
    pub high_price: String,
    pub low_price: String,
    #[serde(default)]
    pub volume: u64,
}

impl HistoricalResponse {
    pub fn into_historical(self) -> Result<Historical> {
        let records = self
            .historicals
            .into_iter()
            .map(|bar| {
                Ok(HistoricalRecord {
                    begins_at: bar.begins_at,
                    open_price: parse_decimal("open price", &bar.open_price)?,
                    close_price: parse_decimal("close price", &bar.close_price)?,
                    high_price: parse_decimal("high price", &bar.high_price)?,
                    low_price: parse_decimal("low price", &bar.low_price)?,
                    volume: bar.volume,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Historical {
            symbol: self.symbol,
            interval: self.interval,
            span: self.span,
            records,
        })
    }
}

/// Body of a new limit order
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest<'a> {
    pub account: &'a str,
    pub instrument: &'a str,
    pub symbol: &'a str,
    #[serde(rename = "type")]
    pub order_type: &'static str,
    pub time_in_force: &'static str,
    pub trigger: &'static str,
    pub price: String,
    pub quantity: String,
    pub side: Side,
}

impl<'a> OrderRequest<'a> {
    /// Good-for-day limit order that triggers immediately
    pub fn limit(account: &'a str, instrument: &'a str, symbol: &'a str, intent: OrderIntent) -> Self {
        Self {
            account,
            instrument,
            symbol,
            order_type: "limit",
            time_in_force: "gfd",
            trigger: "immediate",
            price: intent.price.round_dp(2).to_string(),
            quantity: intent.quantity.to_string(),
            side: intent.side,
        }
    }
}

/// Order acknowledgement
#[derive(Debug, Clone, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub state: String,
    pub side: Side,
    #[serde(default)]
    pub price: Option<String>,
    pub quantity: String,
    #[serde(default)]
    pub reject_reason: Option<String>,
}

impl OrderResponse {
    pub fn into_result(self, symbol: &str) -> Result<OrderResult> {
        if self.state == "rejected" || self.state == "failed" {
            return Err(ClientError::OrderRejected {
                symbol: symbol.to_string(),
                reason: self
                    .reject_reason
                    .unwrap_or_else(|| format!("order {} {}", self.id, self.state)),
            });
        }

        Ok(OrderResult {
            price: parse_optional_decimal("order price", self.price.as_deref())?
                .unwrap_or_default(),
            quantity: parse_shares("order quantity", &self.quantity)?,
            id: self.id,
            state: self.state,
            symbol: symbol.to_string(),
            side: self.side,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_position() {
        let json = r#"{
            "instrument": "https://api.example.com/instruments/abc/",
            "quantity": "3.00000",
            "average_buy_price": "6.0000",
            "created_at": "2023-05-01T14:00:00Z"
        }"#;
        let response: PositionResponse = serde_json::from_str(json).unwrap();
        let position = response.into_position().unwrap();
        assert_eq!(position.quantity, 3);
        assert_eq!(position.average_buy_price, dec!(6));
    }

    #[test]
    fn test_parse_quote_with_nulls() {
        let json = r#"{
            "symbol": "AAPL",
            "instrument": "https://api.example.com/instruments/abc/",
            "ask_price": "8.880000",
            "bid_price": null,
            "last_trade_price": "8.870000",
            "last_extended_hours_trade_price": null,
            "trading_halted": false,
            "updated_at": "2024-01-13T16:00:00Z"
        }"#;
        let response: QuoteResponse = serde_json::from_str(json).unwrap();
        let quote = response.into_quote().unwrap();
        assert_eq!(quote.ask_price, dec!(8.88));
        assert_eq!(quote.bid_price, Decimal::ZERO);
        assert!(!quote.regular_session);
        assert_eq!(quote.effective_price(), Some(dec!(8.87)));
    }

    #[test]
    fn test_parse_fundamentals() {
        let json = r#"{
            "instrument": "https://api.example.com/instruments/abc/",
            "high_52_weeks": "9.99",
            "low_52_weeks": "8.88",
            "average_volume": "1000.0",
            "market_cap": null,
            "dividend_yield": ""
        }"#;
        let response: FundamentalsResponse = serde_json::from_str(json).unwrap();
        let fundamentals = response.into_fundamentals().unwrap();
        assert_eq!(fundamentals.low_52_weeks, dec!(8.88));
        assert_eq!(fundamentals.high_52_weeks, dec!(9.99));
        assert_eq!(fundamentals.market_cap, None);
        assert_eq!(fundamentals.dividend_yield, None);
    }

    #[test]
    fn test_invalid_decimal_is_reported() {
        let err = parse_decimal("bid price", "eight").unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse(_)));
    }

    #[test]
    fn test_order_request_serialization() {
        let request = OrderRequest::limit(
            "https://api.example.com/accounts/1/",
            "https://api.example.com/instruments/abc/",
            "AAPL",
            OrderIntent::buy(dec!(7.771), 100),
        );
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["type"], "limit");
        assert_eq!(value["side"], "buy");
        assert_eq!(value["price"], "7.77");
        assert_eq!(value["quantity"], "100");
    }

    #[test]
    fn test_rejected_order_is_an_error() {
        let response = OrderResponse {
            id: "o1".to_string(),
            state: "rejected".to_string(),
            side: Side::Sell,
            price: Some("8.88".to_string()),
            quantity: "3".to_string(),
            reject_reason: Some("market closed".to_string()),
        };
        let err = response.into_result("AAPL").unwrap_err();
        assert!(matches!(err, ClientError::OrderRejected { .. }));
    }
}
