//! Builds and refreshes the snapshot collection from the brokerage

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::try_join_all;
use tracing::{debug, info, instrument};

use super::types::{Snapshot, SnapshotSet};
use crate::common::errors::{ClientError, Result};
use crate::common::shutdown::Shutdown;
use crate::common::traits::{Brokerage, MAX_FUNDAMENTALS_BATCH};
use crate::common::types::{Fundamentals, Instrument, Position, Quote};

/// Assembles [`SnapshotSet`]s, one remote round per cycle
#[derive(Clone)]
pub struct SnapshotBuilder {
    brokerage: Arc<dyn Brokerage>,
    shutdown: Shutdown,
}

impl SnapshotBuilder {
    pub fn new(brokerage: Arc<dyn Brokerage>, shutdown: Shutdown) -> Self {
        Self {
            brokerage,
            shutdown,
        }
    }

    /// Resolve every symbol to an instrument, then load its market data
    #[instrument(skip(self))]
    pub async fn build(&self, symbols: &[String]) -> Result<SnapshotSet> {
        let lookups = symbols
            .iter()
            .map(|symbol| self.brokerage.get_instrument(symbol));
        let instruments = self
            .shutdown
            .guard(async move { try_join_all(lookups).await })
            .await?;

        info!(count = instruments.len(), "Resolved instruments");

        let tracked = SnapshotSet::new(instruments.into_iter().map(Snapshot::new).collect());
        self.refresh(&tracked).await
    }

    /// Re-fetch positions, quotes and fundamentals for everything tracked
    /// plus anything newly held
    ///
    /// Instrument identity and historicals carry over; every other field
    /// is replaced by what the brokerage returned this time. Any failed
    /// call aborts the refresh and `existing` stays authoritative.
    #[instrument(skip_all, fields(tracked = existing.len()))]
    pub async fn refresh(&self, existing: &SnapshotSet) -> Result<SnapshotSet> {
        let positions = self.shutdown.guard(self.brokerage.get_positions()).await?;

        let mut merged: HashMap<String, Snapshot> = existing
            .iter()
            .map(|s| {
                let carried = Snapshot {
                    instrument: s.instrument.clone(),
                    historical: s.historical.clone(),
                    ..Default::default()
                };
                (s.reference().to_string(), carried)
            })
            .collect();

        for instrument in self.fetch_untracked(&merged, &positions).await? {
            debug!(symbol = %instrument.symbol, "Tracking newly held instrument");
            merged.insert(instrument.url.clone(), Snapshot::new(instrument));
        }

        if merged.is_empty() {
            return Err(ClientError::InvalidResponse(
                "no instruments to track".to_string(),
            ));
        }

        let mut symbols: Vec<String> = merged
            .values()
            .map(|s| s.instrument.symbol.clone())
            .collect();
        symbols.sort();

        let (quotes, fundamentals) = self
            .shutdown
            .guard(async {
                tokio::try_join!(
                    self.brokerage.get_quotes(&symbols),
                    self.fetch_fundamentals(&symbols)
                )
            })
            .await?;

        merge(&mut merged, positions, quotes, fundamentals);

        let refreshed = SnapshotSet::new(merged.into_values().collect());
        debug!(
            count = refreshed.len(),
            held = refreshed.held_count(),
            "Refreshed snapshots"
        );
        Ok(refreshed)
    }

    /// Instruments held but not yet tracked, fetched by reference
    async fn fetch_untracked(
        &self,
        tracked: &HashMap<String, Snapshot>,
        positions: &[Position],
    ) -> Result<Vec<Instrument>> {
        let mut references: Vec<&str> = positions
            .iter()
            .filter(|p| p.quantity > 0 && !tracked.contains_key(&p.instrument))
            .map(|p| p.instrument.as_str())
            .collect();
        references.sort_unstable();
        references.dedup();

        let lookups = references
            .into_iter()
            .map(|reference| self.brokerage.get_instrument_by_reference(reference));
        self.shutdown
            .guard(async move { try_join_all(lookups).await })
            .await
    }

    /// Fundamentals in batches the brokerage accepts, concatenated
    async fn fetch_fundamentals(&self, symbols: &[String]) -> Result<Vec<Fundamentals>> {
        let batches = symbols
            .chunks(MAX_FUNDAMENTALS_BATCH)
            .map(|chunk| self.brokerage.get_fundamentals(chunk));
        let fetched = try_join_all(batches).await?;
        Ok(fetched.into_iter().flatten().collect())
    }
}

/// Overwrite tracked snapshots with this cycle's data, keyed by reference
fn merge(
    merged: &mut HashMap<String, Snapshot>,
    positions: Vec<Position>,
    quotes: Vec<Quote>,
    fundamentals: Vec<Fundamentals>,
) {
    for position in positions {
        if let Some(snapshot) = merged.get_mut(&position.instrument) {
            snapshot.position = (position.quantity > 0).then_some(position);
        }
    }
    for quote in quotes {
        if let Some(snapshot) = merged.get_mut(&quote.instrument) {
            snapshot.quote = Some(quote);
        }
    }
    for fundamentals in fundamentals {
        if let Some(snapshot) = merged.get_mut(&fundamentals.instrument) {
            snapshot.fundamentals = Some(fundamentals);
        }
    }
}
