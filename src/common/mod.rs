//! Common types and traits shared across all modules

pub mod errors;
pub mod market_hours;
pub mod shutdown;
pub mod traits;
pub mod types;

pub use errors::{ClientError, Result};
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use traits::Brokerage;
