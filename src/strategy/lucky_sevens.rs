//! Buy at 7.77-style asks, sell at 8.88-style bids

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::{debug, info};

use super::trend::fixed;
use super::types::Trade;
use crate::common::types::OrderIntent;
use crate::snapshot::Snapshot;

/// 8.88, 8.80, 88.80, 888.88 ...
static SELL_TRIGGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^8+\.8[08]$").expect("sell pattern compiles"));
/// 7.77, 7.70, 77.70, 777.77 ...
static BUY_TRIGGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^7+\.7[07]$").expect("buy pattern compiles"));

/// Notional spent per buy
const TARGET_NOTIONAL: Decimal = dec!(777.77);

#[derive(Debug, Clone, Default)]
pub struct LuckySevens;

impl LuckySevens {
    pub fn new() -> Self {
        Self
    }

    pub fn trades(&self, snapshots: &[Snapshot]) -> Vec<Trade> {
        snapshots.iter().filter_map(|s| self.evaluate(s)).collect()
    }

    fn evaluate(&self, s: &Snapshot) -> Option<Trade> {
        let quote = s.quote.as_ref()?;
        let bid = fixed(quote.bid_price, 2);
        let ask = fixed(quote.ask_price, 2);
        debug!(symbol = s.symbol(), %bid, %ask, "Checking for lucky prices");

        if let Some(position) = s.position.as_ref().filter(|p| p.quantity > 0) {
            if !SELL_TRIGGER.is_match(&bid) {
                return None;
            }
            info!(symbol = s.symbol(), %bid, "Lucky bid");
            return Some(Trade::new(
                s.instrument.clone(),
                OrderIntent::sell(quote.bid_price, position.quantity),
                format!("bid of {} is lucky", bid),
            ));
        }

        if !BUY_TRIGGER.is_match(&ask) {
            return None;
        }
        let quantity = (TARGET_NOTIONAL / quote.ask_price)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u64()
            .filter(|q| *q > 0)?;

        info!(symbol = s.symbol(), %ask, quantity, "Lucky ask");
        Some(Trade::new(
            s.instrument.clone(),
            OrderIntent::buy(quote.ask_price, quantity),
            format!("ask of {} is lucky", ask),
        ))
    }
}
