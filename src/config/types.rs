//! Configuration types

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::strategy::StrategyKind;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Brokerage connection configuration
    #[serde(default)]
    pub brokerage: BrokerageConfig,
    /// Trading loop configuration
    #[serde(default)]
    pub trading: TradingConfig,
    /// Named symbol universes, e.g. `SP50 = ["AAPL", "MSFT", ...]`
    #[serde(default)]
    pub universes: HashMap<String, Vec<String>>,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

/// Brokerage REST API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerageConfig {
    /// Base URL for the REST API
    #[serde(default = "default_brokerage_url")]
    pub base_url: String,
    /// Pre-issued bearer token; skips the password login when set
    #[serde(default)]
    pub access_token: Option<String>,
    /// Account username for the OAuth password grant
    #[serde(default)]
    pub username: Option<String>,
    /// Account password for the OAuth password grant
    #[serde(default)]
    pub password: Option<String>,
    /// OAuth client identifier
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for BrokerageConfig {
    fn default() -> Self {
        Self {
            base_url: default_brokerage_url(),
            access_token: None,
            username: None,
            password: None,
            client_id: default_client_id(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_brokerage_url() -> String {
    "https://api.robinhood.com".to_string()
}

fn default_client_id() -> String {
    "c82SH0WZOsabOXGP2sxqcj34FxkvfnWRZBKlBjFS".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

/// Whether a total cap counts as reached one trade early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitBoundary {
    /// Reject when `total + 1 > cap`; the cap itself is reachable
    #[default]
    Exclusive,
    /// Reject when `total + 1 >= cap`; the cap itself is never reached
    Inclusive,
}

impl LimitBoundary {
    /// Whether one more trade on top of `total` breaks `cap`
    pub fn exceeded(&self, total: u32, cap: u32) -> bool {
        match self {
            LimitBoundary::Exclusive => total + 1 > cap,
            LimitBoundary::Inclusive => total + 1 >= cap,
        }
    }
}

/// What to do with a trade that would break a total cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapAction {
    /// End the run immediately
    #[default]
    Stop,
    /// Drop the trade and keep polling until every budget is spent
    Skip,
}

/// Policy applied when a run-wide buy/sell cap is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LimitPolicy {
    #[serde(default)]
    pub boundary: LimitBoundary,
    #[serde(default)]
    pub on_total_cap: CapAction,
}

/// Trading loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Log intended orders without submitting them
    #[serde(default)]
    pub dry_run: bool,
    /// Strategy to evaluate each cycle
    #[serde(default = "default_strategy")]
    pub strategy: StrategyKind,
    /// Minimum wait between cycles in milliseconds
    #[serde(default = "default_min_poll")]
    pub min_poll_ms: u64,
    /// Maximum wait between cycles in milliseconds
    #[serde(default = "default_max_poll")]
    pub max_poll_ms: u64,
    /// Buys allowed over the whole run
    #[serde(default = "default_total_cap")]
    pub max_buys: u32,
    /// Buys allowed per cycle
    #[serde(default = "default_cycle_cap")]
    pub max_buys_per_poll: u32,
    /// Sales allowed over the whole run
    #[serde(default = "default_total_cap")]
    pub max_sales: u32,
    /// Sales allowed per cycle
    #[serde(default = "default_cycle_cap")]
    pub max_sales_per_poll: u32,
    /// Behaviour at the run-wide caps
    #[serde(default)]
    pub limit_policy: LimitPolicy,
    /// Stop as soon as a cycle proposes no trades
    #[serde(default)]
    pub stop_on_quiescence: bool,
    /// Lucky number for the random strategy
    #[serde(default = "default_lucky_number")]
    pub lucky_number: u64,
    /// Seed for the random strategy; entropy when unset
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Time allowed for the initial snapshot build in seconds
    #[serde(default = "default_initial_build_timeout")]
    pub initial_build_timeout_seconds: u64,
}

impl TradingConfig {
    pub fn min_poll(&self) -> Duration {
        Duration::from_millis(self.min_poll_ms)
    }

    pub fn max_poll(&self) -> Duration {
        Duration::from_millis(self.max_poll_ms)
    }

    pub fn initial_build_timeout(&self) -> Duration {
        Duration::from_secs(self.initial_build_timeout_seconds)
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            strategy: default_strategy(),
            min_poll_ms: default_min_poll(),
            max_poll_ms: default_max_poll(),
            max_buys: default_total_cap(),
            max_buys_per_poll: default_cycle_cap(),
            max_sales: default_total_cap(),
            max_sales_per_poll: default_cycle_cap(),
            limit_policy: LimitPolicy::default(),
            stop_on_quiescence: false,
            lucky_number: default_lucky_number(),
            random_seed: None,
            initial_build_timeout_seconds: default_initial_build_timeout(),
        }
    }
}

fn default_strategy() -> StrategyKind {
    StrategyKind::HiLo
}

fn default_min_poll() -> u64 {
    5_000
}

fn default_max_poll() -> u64 {
    60_000
}

fn default_total_cap() -> u32 {
    5
}

fn default_cycle_cap() -> u32 {
    1
}

fn default_lucky_number() -> u64 {
    4
}

fn default_initial_build_timeout() -> u64 {
    120
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Seconds to wait before trading with real money
    #[serde(default = "default_live_warning_delay")]
    pub live_warning_delay_seconds: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            live_warning_delay_seconds: default_live_warning_delay(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_live_warning_delay() -> u64 {
    10
}
