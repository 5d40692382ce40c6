//! Per-instrument view assembled each polling cycle

use std::cmp::Ordering;

use crate::common::types::{Fundamentals, Historical, Instrument, Position, Quote};

/// Everything known about one instrument in the current cycle
///
/// Only the instrument is mandatory. Strategies skip snapshots whose
/// optional fields they need are missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub instrument: Instrument,
    pub quote: Option<Quote>,
    pub fundamentals: Option<Fundamentals>,
    pub position: Option<Position>,
    pub historical: Option<Historical>,
}

impl Snapshot {
    pub fn new(instrument: Instrument) -> Self {
        Self {
            instrument,
            ..Default::default()
        }
    }

    pub fn with_quote(mut self, quote: Quote) -> Self {
        self.quote = Some(quote);
        self
    }

    pub fn with_fundamentals(mut self, fundamentals: Fundamentals) -> Self {
        self.fundamentals = Some(fundamentals);
        self
    }

    /// Attach a position; zero-share positions count as not held
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = (position.quantity > 0).then_some(position);
        self
    }

    pub fn with_historical(mut self, historical: Historical) -> Self {
        self.historical = Some(historical);
        self
    }

    pub fn symbol(&self) -> &str {
        &self.instrument.symbol
    }

    /// Stable key snapshots are merged on
    pub fn reference(&self) -> &str {
        &self.instrument.url
    }

    pub fn is_held(&self) -> bool {
        self.position.as_ref().map_or(false, |p| p.quantity > 0)
    }

    /// Held instruments first, then by instrument reference
    fn order(&self, other: &Self) -> Ordering {
        other
            .is_held()
            .cmp(&self.is_held())
            .then_with(|| self.reference().cmp(other.reference()))
    }
}

/// Ordered collection of snapshots for one cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotSet {
    snapshots: Vec<Snapshot>,
}

impl SnapshotSet {
    /// Sort into cycle order: held first, then by reference
    pub fn new(mut snapshots: Vec<Snapshot>) -> Self {
        snapshots.sort_by(Snapshot::order);
        Self { snapshots }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn held_count(&self) -> usize {
        self.snapshots.iter().filter(|s| s.is_held()).count()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Snapshot> {
        self.snapshots.iter()
    }

    pub fn as_slice(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Mutable access for strategies that backfill historicals
    pub fn as_mut_slice(&mut self) -> &mut [Snapshot] {
        &mut self.snapshots
    }

    pub fn symbols(&self) -> Vec<String> {
        self.snapshots
            .iter()
            .map(|s| s.instrument.symbol.clone())
            .collect()
    }

    pub fn get(&self, reference: &str) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| s.reference() == reference)
    }
}

impl IntoIterator for SnapshotSet {
    type Item = Snapshot;
    type IntoIter = std::vec::IntoIter<Snapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.snapshots.into_iter()
    }
}

impl<'a> IntoIterator for &'a SnapshotSet {
    type Item = &'a Snapshot;
    type IntoIter = std::slice::Iter<'a, Snapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.snapshots.iter()
    }
}
