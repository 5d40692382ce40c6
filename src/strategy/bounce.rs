//! Trade near 52-week extremes only once the short-term trend turns

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, instrument, warn};

use super::trend::{downward, fixed, last_n, percent_diff, upward};
use super::types::{StrategyContext, Trade};
use crate::common::errors::{ClientError, Result};
use crate::common::types::{Historical, Interval, OrderIntent, Span};
use crate::snapshot::Snapshot;

/// Price points needed to call a trend
pub const MIN_TREND: usize = 8;
/// Widest distance from the 52-week low that still allows a buy
const BOUNCE_NEARNESS: Decimal = dec!(1.2);
/// Widest distance from the 52-week high that still allows a sale
const SELL_NEARNESS: Decimal = dec!(1.8);
/// Further below the 52-week low than this is treated as bad data
const TOO_FAR_OFF: Decimal = dec!(-10);
/// Smallest overall move that counts as a bounce
const MIN_BOUNCE: Decimal = dec!(0.01);

#[derive(Debug, Clone, Default)]
pub struct Bounce;

impl Bounce {
    pub fn new() -> Self {
        Self
    }

    pub async fn trades(
        &self,
        snapshots: &[Snapshot],
        ctx: &StrategyContext<'_>,
    ) -> Result<Vec<Trade>> {
        let mut trades = Vec::new();
        for s in snapshots {
            let trade = if s.is_held() {
                self.evaluate_sell(s, ctx).await?
            } else {
                self.evaluate_buy(s, ctx).await?
            };
            trades.extend(trade);
        }
        Ok(trades)
    }

    async fn evaluate_buy(&self, s: &Snapshot, ctx: &StrategyContext<'_>) -> Result<Option<Trade>> {
        let (Some(quote), Some(fundamentals)) = (&s.quote, &s.fundamentals) else {
            return Ok(None);
        };
        let low = fundamentals.low_52_weeks;
        let ask = quote.ask_price;
        let Some(perc) = percent_diff(low, ask) else {
            return Ok(None);
        };

        if perc > BOUNCE_NEARNESS {
            return Ok(None);
        }
        if perc < TOO_FAR_OFF {
            warn!(symbol = s.symbol(), %ask, %low, "Ask is far below the 52-week low; skipping");
            return Ok(None);
        }
        debug!(symbol = s.symbol(), %ask, %low, perc = %fixed(perc, 2), "Ask is near the 52-week low");

        let Some(historical) = backfill(s, ctx).await? else {
            return Ok(None);
        };
        let mut points = historical.price_points();
        points.push(ask);
        if points.len() < MIN_TREND {
            debug!(symbol = s.symbol(), points = points.len(), "Not enough historical data");
            return Ok(None);
        }

        let recent = last_n(&points, MIN_TREND);
        let Some((ok, bounce)) = upward(recent) else {
            return Ok(None);
        };
        if !ok || bounce <= MIN_BOUNCE {
            debug!(symbol = s.symbol(), upward = ok, bounce = %fixed(bounce, 2), "Wait to buy");
            return Ok(None);
        }

        info!(symbol = s.symbol(), bounce = %fixed(bounce, 2), "Buy on upward bounce");
        Ok(Some(Trade::new(
            s.instrument.clone(),
            OrderIntent::buy(ask, 1),
            format!(
                "{}% away from 52wk low of {}, {}% bounce",
                fixed(perc, 1),
                fixed(low, 2),
                fixed(bounce, 2)
            ),
        )))
    }

    async fn evaluate_sell(&self, s: &Snapshot, ctx: &StrategyContext<'_>) -> Result<Option<Trade>> {
        let (Some(quote), Some(fundamentals), Some(position)) =
            (&s.quote, &s.fundamentals, &s.position)
        else {
            return Ok(None);
        };
        let high = fundamentals.high_52_weeks;
        let bid = quote.bid_price;
        if high.is_zero() {
            return Ok(None);
        }
        let Some(perc) = percent_diff(bid, high) else {
            return Ok(None);
        };

        if perc < Decimal::ZERO {
            warn!(symbol = s.symbol(), %bid, %high, "Bid is above the 52-week high; skipping");
            return Ok(None);
        }
        if perc > SELL_NEARNESS {
            return Ok(None);
        }
        if bid <= position.average_buy_price {
            debug!(
                symbol = s.symbol(),
                %bid,
                paid = %position.average_buy_price,
                "Would sell but the bid is not above cost"
            );
            return Ok(None);
        }

        let Some(historical) = backfill(s, ctx).await? else {
            return Ok(None);
        };
        let mut points = historical.price_points();
        points.push(bid);
        if points.len() < MIN_TREND {
            debug!(symbol = s.symbol(), points = points.len(), "Not enough historical data");
            return Ok(None);
        }

        let recent = last_n(&points, MIN_TREND);
        let Some((ok, bounce)) = downward(recent) else {
            return Ok(None);
        };
        if !ok || bounce >= -MIN_BOUNCE {
            debug!(symbol = s.symbol(), downward = ok, bounce = %fixed(bounce, 2), "Wait to sell");
            return Ok(None);
        }

        info!(symbol = s.symbol(), bounce = %fixed(bounce, 2), "Sell on downward bounce");
        Ok(Some(Trade::new(
            s.instrument.clone(),
            OrderIntent::sell(bid, position.quantity),
            format!(
                "{}% away from 52-week high of {}, {}% bounce",
                fixed(perc, 1),
                fixed(high, 2),
                fixed(bounce, 2)
            ),
        )))
    }
}

/// The snapshot's series, or today's 5-minute bars when it has none.
///
/// A failed fetch skips only this instrument; cancellation still ends the cycle.
#[instrument(skip_all, fields(symbol = s.symbol()))]
async fn backfill(s: &Snapshot, ctx: &StrategyContext<'_>) -> Result<Option<Historical>> {
    if let Some(historical) = &s.historical {
        return Ok(Some(historical.clone()));
    }
    let fetched = ctx
        .shutdown
        .guard(
            ctx.brokerage
                .get_historical(Interval::FiveMinute, Span::Day, s.symbol()),
        )
        .await;
    match fetched {
        Ok(historical) => Ok(Some(historical)),
        Err(ClientError::Cancelled) => Err(ClientError::Cancelled),
        Err(e) => {
            warn!(error = %e, "Historicals unavailable; skipping");
            Ok(None)
        }
    }
}
