//! Strategy module for trade decision making
//!
//! A strategy turns one cycle's snapshots into proposed [`Trade`]s. The
//! set of strategies is closed and picked once at startup.
//!
//! # Architecture
//!
//! ```text
//! SnapshotSet ──► Strategy::trades() ──► Vec<Trade> ──► TradeExecutor
//!                      │
//!                      └─► Brokerage::get_historical (Bounce backfill only)
//! ```
//!
//! # Variants
//!
//! - [`HiLo`]: buy near the 52-week low, sell near the 52-week high
//! - [`Bounce`]: like HiLo, but only once the short-term trend turns
//! - [`LuckySevens`]: buy 7.77-style asks, sell 8.88-style bids
//! - [`RandomPicker`]: random trades for load testing

mod bounce;
mod hilo;
mod lucky_sevens;
mod random;
pub mod trend;
mod types;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use bounce::{Bounce, MIN_TREND};
pub use hilo::HiLo;
pub use lucky_sevens::LuckySevens;
pub use random::RandomPicker;
pub use types::{StrategyContext, Trade};

use crate::common::errors::{ClientError, Result};
use crate::config::types::TradingConfig;
use crate::snapshot::Snapshot;

/// Strategy names accepted in configuration and on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    #[serde(rename = "hilo")]
    HiLo,
    Bounce,
    LuckySevens,
    Random,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::HiLo,
        StrategyKind::Bounce,
        StrategyKind::LuckySevens,
        StrategyKind::Random,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::HiLo => "hilo",
            StrategyKind::Bounce => "bounce",
            StrategyKind::LuckySevens => "lucky-sevens",
            StrategyKind::Random => "random",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| {
                let choices: Vec<_> = Self::ALL.iter().map(|k| k.as_str()).collect();
                ClientError::Configuration(format!(
                    "no strategy named {:?}; choose one of: {}",
                    s,
                    choices.join(", ")
                ))
            })
    }
}

/// The strategy evaluated every cycle
#[derive(Debug)]
pub enum Strategy {
    HiLo(HiLo),
    Bounce(Bounce),
    LuckySevens(LuckySevens),
    Random(RandomPicker),
}

impl Strategy {
    pub fn from_config(config: &TradingConfig) -> Self {
        match config.strategy {
            StrategyKind::HiLo => Strategy::HiLo(HiLo::new()),
            StrategyKind::Bounce => Strategy::Bounce(Bounce::new()),
            StrategyKind::LuckySevens => Strategy::LuckySevens(LuckySevens::new()),
            StrategyKind::Random => {
                Strategy::Random(RandomPicker::new(config.lucky_number, config.random_seed))
            }
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::HiLo(_) => StrategyKind::HiLo,
            Strategy::Bounce(_) => StrategyKind::Bounce,
            Strategy::LuckySevens(_) => StrategyKind::LuckySevens,
            Strategy::Random(_) => StrategyKind::Random,
        }
    }

    /// Unique identifier for this strategy
    pub fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Proposed trades for this cycle, in snapshot order
    ///
    /// Instruments with missing or nonsensical data are skipped. An error
    /// means backfill data could not be fetched and the cycle should be
    /// retried.
    pub async fn trades(
        &mut self,
        snapshots: &[Snapshot],
        ctx: &StrategyContext<'_>,
    ) -> Result<Vec<Trade>> {
        match self {
            Strategy::HiLo(s) => Ok(s.trades(snapshots)),
            Strategy::Bounce(s) => s.trades(snapshots, ctx).await,
            Strategy::LuckySevens(s) => Ok(s.trades(snapshots)),
            Strategy::Random(s) => Ok(s.trades(snapshots)),
        }
    }
}
