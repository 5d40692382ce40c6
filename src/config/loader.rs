//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{ClientError, Result};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with APP_)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    // Add environment variables with APP_ prefix
    builder = builder.add_source(
        Environment::with_prefix("APP")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ClientError::Configuration(e.to_string()))?;

    let app: AppConfig = config
        .try_deserialize()
        .map_err(|e| ClientError::Configuration(e.to_string()))?;

    Ok(app)
}

/// Fill brokerage credentials from the conventional environment variables
/// when the file and `APP__` variables left them empty
pub fn apply_credential_env(app: &mut AppConfig) {
    let brokerage = &mut app.brokerage;
    if brokerage.access_token.is_none() {
        brokerage.access_token = std::env::var("BROKERAGE_ACCESS_TOKEN").ok();
    }
    if brokerage.username.is_none() {
        brokerage.username = std::env::var("BROKERAGE_USER").ok();
    }
    if brokerage.password.is_none() {
        brokerage.password = std::env::var("BROKERAGE_PASS").ok();
    }
}

/// Reject settings that cannot produce a sane run
///
/// Run after CLI overrides so a flag can correct a file value.
pub fn validate(app: &AppConfig) -> Result<()> {
    let trading = &app.trading;

    if trading.min_poll_ms > trading.max_poll_ms {
        return Err(ClientError::Configuration(format!(
            "min poll ({}ms) is greater than max poll ({}ms)",
            trading.min_poll_ms, trading.max_poll_ms
        )));
    }

    if trading.max_buys_per_poll == 0 && trading.max_sales_per_poll == 0 {
        return Err(ClientError::Configuration(
            "per-poll buy and sale limits are both zero; nothing could ever trade".to_string(),
        ));
    }

    if trading.lucky_number == 0 {
        return Err(ClientError::Configuration(
            "lucky number must be positive".to_string(),
        ));
    }

    url::Url::parse(&app.brokerage.base_url)?;

    Ok(())
}
