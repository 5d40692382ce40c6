//! Buy near the 52-week low, sell near the 52-week high

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, warn};

use super::trend::{fixed, percent_diff};
use super::types::Trade;
use crate::common::types::OrderIntent;
use crate::snapshot::Snapshot;

/// Widest distance from a 52-week bound that still triggers a trade
const NEARNESS: Decimal = dec!(0.9);

#[derive(Debug, Clone, Default)]
pub struct HiLo;

impl HiLo {
    pub fn new() -> Self {
        Self
    }

    pub fn trades(&self, snapshots: &[Snapshot]) -> Vec<Trade> {
        snapshots
            .iter()
            .filter_map(|s| {
                if s.is_held() {
                    self.evaluate_sell(s)
                } else {
                    self.evaluate_buy(s)
                }
            })
            .collect()
    }

    fn evaluate_buy(&self, s: &Snapshot) -> Option<Trade> {
        let (quote, fundamentals) = (s.quote.as_ref()?, s.fundamentals.as_ref()?);
        let low = fundamentals.low_52_weeks;
        let ask = quote.ask_price;
        let perc = percent_diff(low, ask)?;

        if perc < Decimal::ZERO {
            warn!(symbol = s.symbol(), %ask, %low, "Ask is below the 52-week low; skipping");
            return None;
        }
        if perc > NEARNESS {
            return None;
        }

        info!(symbol = s.symbol(), %ask, %low, "Ask is near the 52-week low");
        Some(Trade::new(
            s.instrument.clone(),
            OrderIntent::buy(ask, 1),
            format!(
                "{}% away from 52wk low of {}",
                fixed(perc, 1),
                fixed(low, 2)
            ),
        ))
    }

    fn evaluate_sell(&self, s: &Snapshot) -> Option<Trade> {
        let (quote, fundamentals, position) = (
            s.quote.as_ref()?,
            s.fundamentals.as_ref()?,
            s.position.as_ref()?,
        );
        let high = fundamentals.high_52_weeks;
        let bid = quote.bid_price;
        if high.is_zero() {
            return None;
        }
        let perc = percent_diff(bid, high)?;

        if perc < Decimal::ZERO {
            warn!(symbol = s.symbol(), %bid, %high, "Bid is above the 52-week high; skipping");
            return None;
        }
        if perc > NEARNESS {
            return None;
        }
        if bid <= position.average_buy_price {
            debug!(
                symbol = s.symbol(),
                %bid,
                paid = %position.average_buy_price,
                "Would sell but the bid is not above cost"
            );
            return None;
        }

        info!(symbol = s.symbol(), %bid, %high, "Bid is near the 52-week high");
        Some(Trade::new(
            s.instrument.clone(),
            OrderIntent::sell(bid, position.quantity),
            format!(
                "{}% away from 52-week high of {}",
                fixed(perc, 1),
                fixed(high, 2)
            ),
        ))
    }
}
