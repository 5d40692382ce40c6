//! Configuration loading and types

pub mod loader;
pub mod types;

pub use loader::{apply_credential_env, load_config, validate};
pub use types::{
    AppConfig, AppSettings, BrokerageConfig, CapAction, LimitBoundary, LimitPolicy, TradingConfig,
};
