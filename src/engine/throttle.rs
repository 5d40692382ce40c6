//! Buy/sell caps and order submission
//!
//! The executor owns every trade counter for the run. Each cycle it walks
//! the proposed trades in order, discards what breaks a per-cycle cap,
//! stops (or skips, per [`LimitPolicy`]) at a run-wide cap, and submits
//! the rest.

use thiserror::Error;
use tracing::{error, info, warn};

use crate::common::errors::{ClientError, Result};
use crate::common::shutdown::Shutdown;
use crate::common::traits::Brokerage;
use crate::common::types::Side;
use crate::config::types::{CapAction, LimitPolicy, TradingConfig};
use crate::strategy::Trade;

/// A run-wide cap was reached and the policy says to stop
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum LimitExceeded {
    #[error("buy limit reached: {total} of {cap} buys already submitted")]
    Buys { total: u32, cap: u32 },

    #[error("sale limit reached: {total} of {cap} sales already submitted")]
    Sales { total: u32, cap: u32 },
}

/// Caps applied by the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeLimits {
    pub max_buys: u32,
    pub max_buys_per_poll: u32,
    pub max_sales: u32,
    pub max_sales_per_poll: u32,
    pub policy: LimitPolicy,
}

impl From<&TradingConfig> for TradeLimits {
    fn from(config: &TradingConfig) -> Self {
        Self {
            max_buys: config.max_buys,
            max_buys_per_poll: config.max_buys_per_poll,
            max_sales: config.max_sales,
            max_sales_per_poll: config.max_sales_per_poll,
            policy: config.limit_policy,
        }
    }
}

/// What happened to one cycle's proposed trades
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
    /// Accepted by the brokerage, or logged in dry-run mode
    pub submitted: Vec<Trade>,
    /// Dropped by a cap without ending the run
    pub discarded: usize,
    /// Passed the caps but the brokerage call failed
    pub failed: usize,
    /// Set when a run-wide cap ended the run
    pub stop: Option<LimitExceeded>,
}

impl ExecutionReport {
    pub fn should_continue(&self) -> bool {
        self.stop.is_none()
    }
}

/// Enforces the caps and submits surviving trades
#[derive(Debug, Clone)]
pub struct TradeExecutor {
    limits: TradeLimits,
    dry_run: bool,
    total_buys: u32,
    total_sales: u32,
    cycle_buys: u32,
    cycle_sales: u32,
}

/// Outcome of checking one trade against the caps
enum Admission {
    Submit,
    Discard,
    Stop(LimitExceeded),
}

impl TradeExecutor {
    pub fn new(limits: TradeLimits, dry_run: bool) -> Self {
        Self {
            limits,
            dry_run,
            total_buys: 0,
            total_sales: 0,
            cycle_buys: 0,
            cycle_sales: 0,
        }
    }

    pub fn limits(&self) -> &TradeLimits {
        &self.limits
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn total_buys(&self) -> u32 {
        self.total_buys
    }

    pub fn total_sales(&self) -> u32 {
        self.total_sales
    }

    /// Whether neither side can ever trade again this run
    pub fn budgets_exhausted(&self) -> bool {
        let boundary = self.limits.policy.boundary;
        boundary.exceeded(self.total_buys, self.limits.max_buys)
            && boundary.exceeded(self.total_sales, self.limits.max_sales)
    }

    /// Run one cycle's trades through the caps and submit the survivors
    ///
    /// Per-cycle counters reset on entry. Submission failures are counted
    /// and skipped; only a stop request aborts with an error.
    pub async fn apply(
        &mut self,
        trades: Vec<Trade>,
        brokerage: &dyn Brokerage,
        shutdown: &Shutdown,
    ) -> Result<ExecutionReport> {
        self.cycle_buys = 0;
        self.cycle_sales = 0;

        let mut report = ExecutionReport::default();

        for trade in trades {
            if shutdown.is_cancelled() {
                return Err(ClientError::Cancelled);
            }

            match self.admit(&trade) {
                Admission::Discard => {
                    report.discarded += 1;
                    continue;
                }
                Admission::Stop(limit) => {
                    warn!(symbol = trade.symbol(), "{}", limit);
                    report.stop = Some(limit);
                    break;
                }
                Admission::Submit => {}
            }

            if self.dry_run {
                info!(
                    "[DRY RUN] would {} {} x{} @ {}: {}",
                    trade.side(),
                    trade.symbol(),
                    trade.order.quantity,
                    trade.order.price,
                    trade.reason
                );
                report.submitted.push(trade);
                continue;
            }

            info!(
                "Submitting {} {} x{} @ {}: {}",
                trade.side(),
                trade.symbol(),
                trade.order.quantity,
                trade.order.price,
                trade.reason
            );

            let submission = shutdown
                .guard(brokerage.submit_order(
                    &trade.instrument.url,
                    &trade.instrument.symbol,
                    trade.order,
                ))
                .await;

            match submission {
                Ok(order) => {
                    info!(id = %order.id, state = %order.state, symbol = trade.symbol(), "Order accepted");
                    report.submitted.push(trade);
                }
                Err(ClientError::Cancelled) => return Err(ClientError::Cancelled),
                Err(e) => {
                    error!(symbol = trade.symbol(), side = %trade.side(), "Order failed: {}", e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Check the caps for one trade and count it if it passes
    fn admit(&mut self, trade: &Trade) -> Admission {
        let limits = self.limits;
        let (cycle, total, per_poll, cap) = match trade.side() {
            Side::Buy => (
                &mut self.cycle_buys,
                &mut self.total_buys,
                limits.max_buys_per_poll,
                limits.max_buys,
            ),
            Side::Sell => (
                &mut self.cycle_sales,
                &mut self.total_sales,
                limits.max_sales_per_poll,
                limits.max_sales,
            ),
        };

        if *cycle + 1 > per_poll {
            warn!(
                symbol = trade.symbol(),
                side = %trade.side(),
                "Discarding trade: {} per poll allowed",
                per_poll
            );
            return Admission::Discard;
        }

        if limits.policy.boundary.exceeded(*total, cap) {
            let limit = match trade.side() {
                Side::Buy => LimitExceeded::Buys { total: *total, cap },
                Side::Sell => LimitExceeded::Sales { total: *total, cap },
            };
            return match limits.policy.on_total_cap {
                CapAction::Stop => Admission::Stop(limit),
                CapAction::Skip => {
                    warn!(symbol = trade.symbol(), "Discarding trade: {}", limit);
                    Admission::Discard
                }
            };
        }

        *cycle += 1;
        *total += 1;
        Admission::Submit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::traits::MockBrokerage;
    use crate::common::types::{Instrument, OrderIntent, OrderResult};
    use crate::config::types::LimitBoundary;
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};

    fn trade(symbol: &str, order: OrderIntent) -> Trade {
        Trade::new(
            Instrument::new(symbol, format!("https://api.test/{}/", symbol)),
            order,
            "test",
        )
    }

    fn buy(symbol: &str) -> Trade {
        trade(symbol, OrderIntent::buy(dec!(10.00), 1))
    }

    fn sell(symbol: &str) -> Trade {
        trade(symbol, OrderIntent::sell(dec!(12.00), 2))
    }

    fn limits(max_buys: u32, per_poll: u32, policy: LimitPolicy) -> TradeLimits {
        TradeLimits {
            max_buys,
            max_buys_per_poll: per_poll,
            max_sales: max_buys,
            max_sales_per_poll: per_poll,
            policy,
        }
    }

    fn stop(boundary: LimitBoundary) -> LimitPolicy {
        LimitPolicy {
            boundary,
            on_total_cap: CapAction::Stop,
        }
    }

    /// A brokerage that accepts everything and records the symbols
    fn recording() -> (MockBrokerage, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let mut mock = MockBrokerage::new();
        mock.expect_submit_order()
            .returning(move |_, symbol, intent| {
                log.lock().unwrap().push(symbol.to_string());
                Ok(OrderResult {
                    id: format!("order-{}", symbol),
                    state: "queued".to_string(),
                    symbol: symbol.to_string(),
                    side: intent.side,
                    price: intent.price,
                    quantity: intent.quantity,
                })
            });
        (mock, seen)
    }

    #[tokio::test]
    async fn test_per_cycle_cap_discards_extra() {
        let (mock, seen) = recording();
        let mut executor = TradeExecutor::new(limits(10, 2, LimitPolicy::default()), false);

        let report = executor
            .apply(
                vec![buy("A"), buy("B"), buy("C"), sell("D")],
                &mock,
                &Shutdown::never(),
            )
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["A", "B", "D"]);
        assert_eq!(report.discarded, 1);
        assert!(report.should_continue());
        assert_eq!(executor.total_buys(), 2);
        assert_eq!(executor.total_sales(), 1);
    }

    #[tokio::test]
    async fn test_cycle_counters_reset_between_cycles() {
        let (mock, seen) = recording();
        let mut executor = TradeExecutor::new(limits(10, 1, LimitPolicy::default()), false);
        let shutdown = Shutdown::never();

        executor
            .apply(vec![buy("A"), buy("B")], &mock, &shutdown)
            .await
            .unwrap();
        executor
            .apply(vec![buy("C"), buy("D")], &mock, &shutdown)
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["A", "C"]);
        assert_eq!(executor.total_buys(), 2);
    }

    #[tokio::test]
    async fn test_exclusive_stops_at_trade_after_cap() {
        let (mock, seen) = recording();
        let mut executor = TradeExecutor::new(limits(3, 10, stop(LimitBoundary::Exclusive)), false);

        let report = executor
            .apply(
                vec![buy("A"), buy("B"), buy("C"), buy("D"), buy("E")],
                &mock,
                &Shutdown::never(),
            )
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["A", "B", "C"]);
        assert_eq!(report.stop, Some(LimitExceeded::Buys { total: 3, cap: 3 }));
        assert!(!report.should_continue());
    }

    #[tokio::test]
    async fn test_inclusive_stops_one_trade_earlier() {
        let (mock, seen) = recording();
        let mut executor = TradeExecutor::new(limits(3, 10, stop(LimitBoundary::Inclusive)), false);

        let report = executor
            .apply(
                vec![buy("A"), buy("B"), buy("C"), buy("D")],
                &mock,
                &Shutdown::never(),
            )
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["A", "B"]);
        assert_eq!(report.stop, Some(LimitExceeded::Buys { total: 2, cap: 3 }));
    }

    #[tokio::test]
    async fn test_nothing_after_stop_is_submitted() {
        let (mock, seen) = recording();
        let mut executor = TradeExecutor::new(limits(1, 10, stop(LimitBoundary::Exclusive)), false);

        let report = executor
            .apply(
                vec![buy("A"), sell("B"), buy("C"), sell("D"), sell("E")],
                &mock,
                &Shutdown::never(),
            )
            .await
            .unwrap();

        // C breaks the buy cap; the sale after it is never reached
        assert_eq!(*seen.lock().unwrap(), vec!["A", "B"]);
        assert_eq!(report.submitted.len(), 2);
        assert!(report.stop.is_some());
    }

    #[tokio::test]
    async fn test_skip_policy_keeps_going() {
        let (mock, seen) = recording();
        let policy = LimitPolicy {
            boundary: LimitBoundary::Exclusive,
            on_total_cap: CapAction::Skip,
        };
        let mut executor = TradeExecutor::new(limits(1, 10, policy), false);

        let report = executor
            .apply(
                vec![buy("A"), buy("B"), sell("C"), sell("D")],
                &mock,
                &Shutdown::never(),
            )
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["A", "C"]);
        assert_eq!(report.discarded, 2);
        assert!(report.should_continue());
        assert!(executor.budgets_exhausted());
    }

    #[tokio::test]
    async fn test_dry_run_counts_without_submitting() {
        let mut mock = MockBrokerage::new();
        mock.expect_submit_order().never();
        let mut executor = TradeExecutor::new(limits(5, 5, LimitPolicy::default()), true);

        let report = executor
            .apply(vec![buy("A"), sell("B")], &mock, &Shutdown::never())
            .await
            .unwrap();

        assert_eq!(report.submitted.len(), 2);
        assert_eq!(executor.total_buys(), 1);
        assert_eq!(executor.total_sales(), 1);
    }

    #[tokio::test]
    async fn test_failed_submission_is_counted_and_skipped() {
        let mut mock = MockBrokerage::new();
        mock.expect_submit_order()
            .withf(|reference, symbol, intent| {
                reference == "https://api.test/A/"
                    && symbol == "A"
                    && *intent == OrderIntent::buy(dec!(10.00), 1)
            })
            .returning(|_, symbol, _| {
                Err(ClientError::OrderRejected {
                    symbol: symbol.to_string(),
                    reason: "insufficient buying power".to_string(),
                })
            });
        mock.expect_submit_order()
            .withf(|_, symbol, _| symbol == "B")
            .returning(|_, symbol, intent| {
                Ok(OrderResult {
                    id: "1".to_string(),
                    state: "queued".to_string(),
                    symbol: symbol.to_string(),
                    side: intent.side,
                    price: intent.price,
                    quantity: intent.quantity,
                })
            });
        let mut executor = TradeExecutor::new(limits(5, 5, LimitPolicy::default()), false);

        let report = executor
            .apply(vec![buy("A"), sell("B")], &mock, &Shutdown::never())
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.submitted.len(), 1);
        assert_eq!(report.submitted[0].symbol(), "B");
        assert_eq!(executor.total_buys(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_submission() {
        let mut mock = MockBrokerage::new();
        mock.expect_submit_order().never();
        let (trigger, shutdown) = Shutdown::new();
        trigger.trigger();
        let mut executor = TradeExecutor::new(limits(5, 5, LimitPolicy::default()), false);

        let result = executor.apply(vec![buy("A")], &mock, &shutdown).await;

        assert!(matches!(result, Err(ClientError::Cancelled)));
    }

    /// Never more than the per-poll caps in one cycle, never more than the
    /// totals across the run, whatever the mix of proposals
    #[tokio::test]
    async fn test_caps_hold_for_many_streams() {
        for boundary in [LimitBoundary::Exclusive, LimitBoundary::Inclusive] {
            for on_total_cap in [CapAction::Stop, CapAction::Skip] {
                let policy = LimitPolicy {
                    boundary,
                    on_total_cap,
                };
                let (mock, seen) = recording();
                let limits = TradeLimits {
                    max_buys: 4,
                    max_buys_per_poll: 2,
                    max_sales: 3,
                    max_sales_per_poll: 1,
                    policy,
                };
                let mut executor = TradeExecutor::new(limits, false);
                let shutdown = Shutdown::never();

                for cycle in 0..6 {
                    let before = seen.lock().unwrap().len();
                    let trades: Vec<_> = (0..5)
                        .map(|i| {
                            let name = format!("{}-{}", cycle, i);
                            if (cycle + i) % 3 == 0 {
                                sell(&name)
                            } else {
                                buy(&name)
                            }
                        })
                        .collect();
                    let report = executor.apply(trades, &mock, &shutdown).await.unwrap();

                    let buys = report.submitted.iter().filter(|t| t.is_buy()).count();
                    let sales = report.submitted.len() - buys;
                    assert!(buys <= 2);
                    assert!(sales <= 1);
                    assert_eq!(seen.lock().unwrap().len() - before, report.submitted.len());
                    assert!(executor.total_buys() <= 4);
                    assert!(executor.total_sales() <= 3);

                    if report.stop.is_some() {
                        break;
                    }
                }
            }
        }
    }
}
