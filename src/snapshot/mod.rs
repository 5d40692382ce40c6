//! Snapshot module - the per-cycle view of every tracked instrument

pub mod builder;
pub mod types;

pub use builder::SnapshotBuilder;
pub use types::{Snapshot, SnapshotSet};
