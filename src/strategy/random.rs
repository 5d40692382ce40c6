//! Trades on dice rolls; exercises the execution path under load

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use super::types::Trade;
use crate::common::types::OrderIntent;
use crate::snapshot::Snapshot;

pub struct RandomPicker {
    lucky: u64,
    rng: StdRng,
}

impl RandomPicker {
    /// A picker drawing against `lucky`; seeded runs are reproducible
    pub fn new(lucky: u64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { lucky, rng }
    }

    pub fn lucky(&self) -> u64 {
        self.lucky
    }

    /// Exclusive upper bound of every draw this cycle
    pub fn ceiling(&self, snapshots: &[Snapshot]) -> u64 {
        let held = snapshots.iter().filter(|s| s.is_held()).count();
        (snapshots.len() + held) as u64 * self.lucky
    }

    pub fn trades(&mut self, snapshots: &[Snapshot]) -> Vec<Trade> {
        let ceiling = self.ceiling(snapshots);
        if ceiling == 0 {
            return Vec::new();
        }

        let mut trades = Vec::new();

        for s in snapshots.iter().filter(|s| s.is_held()) {
            let draw = self.rng.gen_range(0..ceiling);
            if draw != self.lucky {
                continue;
            }
            let (Some(quote), Some(position)) = (&s.quote, &s.position) else {
                continue;
            };
            info!(symbol = s.symbol(), draw, "Lucky draw for sale");
            trades.push(Trade::new(
                s.instrument.clone(),
                OrderIntent::sell(quote.bid_price, position.quantity),
                format!("drew {} out of {}", draw, ceiling),
            ));
        }

        for s in snapshots {
            let draw = self.rng.gen_range(0..ceiling);
            if draw != self.lucky {
                continue;
            }
            let Some(quote) = &s.quote else {
                continue;
            };
            info!(symbol = s.symbol(), draw, "Lucky draw for purchase");
            trades.push(Trade::new(
                s.instrument.clone(),
                OrderIntent::buy(quote.ask_price, self.lucky),
                format!("drew {} out of {}", draw, ceiling),
            ));
        }

        trades
    }
}

impl std::fmt::Debug for RandomPicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomPicker")
            .field("lucky", &self.lucky)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::{Instrument, Position, Quote, Side};
    use rust_decimal_macros::dec;

    fn universe(count: usize, held: usize) -> Vec<Snapshot> {
        (0..count)
            .map(|i| {
                let url = format!("https://api.test/{}/", i);
                let snapshot = Snapshot::new(Instrument::new(format!("S{}", i), url.clone()))
                    .with_quote(Quote {
                        bid_price: dec!(10.00),
                        ask_price: dec!(10.05),
                        ..Default::default()
                    });
                if i < held {
                    snapshot.with_position(Position {
                        instrument: url,
                        quantity: 5,
                        ..Default::default()
                    })
                } else {
                    snapshot
                }
            })
            .collect()
    }

    #[test]
    fn test_ceiling_counts_held_twice() {
        let picker = RandomPicker::new(4, Some(1));
        assert_eq!(picker.ceiling(&universe(10, 3)), 52);
    }

    #[test]
    fn test_empty_universe_trades_nothing() {
        let mut picker = RandomPicker::new(4, Some(1));
        assert!(picker.trades(&[]).is_empty());
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let snapshots = universe(20, 5);
        let mut a = RandomPicker::new(4, Some(7));
        let mut b = RandomPicker::new(4, Some(7));
        for _ in 0..50 {
            assert_eq!(a.trades(&snapshots), b.trades(&snapshots));
        }
    }

    #[test]
    fn test_trade_shapes() {
        let snapshots = universe(3, 1);
        let mut picker = RandomPicker::new(4, Some(11));
        let mut seen = 0;
        for _ in 0..500 {
            for trade in picker.trades(&snapshots) {
                seen += 1;
                match trade.side() {
                    Side::Buy => {
                        assert_eq!(trade.order.quantity, 4);
                        assert_eq!(trade.order.price, dec!(10.05));
                    }
                    Side::Sell => {
                        assert_eq!(trade.order.quantity, 5);
                        assert_eq!(trade.order.price, dec!(10.00));
                        assert_eq!(trade.symbol(), "S0");
                    }
                }
            }
        }
        assert!(seen > 0);
    }
}
