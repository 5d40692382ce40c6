//! StockPoller - Main Entry Point
//!
//! Polls a brokerage on a fixed cadence and trades the given symbols with
//! the chosen strategy until a buy/sell limit is hit or Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use stock_poller::config::{apply_credential_env, load_config, validate, AppConfig};
use stock_poller::{universe, BrokerageRestClient, PollLoop, Shutdown, StrategyKind};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Log intended orders without submitting them
    #[arg(long)]
    dry_run: bool,

    /// Strategy to use: hilo, bounce, lucky-sevens or random
    #[arg(short, long)]
    strategy: Option<StrategyKind>,

    /// Minimum time between polls in milliseconds
    #[arg(long)]
    min_poll_ms: Option<u64>,

    /// Maximum time between polls in milliseconds
    #[arg(long)]
    max_poll_ms: Option<u64>,

    /// Maximum buys before exiting
    #[arg(long)]
    max_buys: Option<u32>,

    /// Maximum buys per polling period
    #[arg(long)]
    max_buys_per_poll: Option<u32>,

    /// Maximum sales before exiting
    #[arg(long)]
    max_sales: Option<u32>,

    /// Maximum sales per polling period
    #[arg(long)]
    max_sales_per_poll: Option<u32>,

    /// Tickers to trade; `^NAME` expands a universe from the config file
    #[arg(required = true)]
    symbols: Vec<String>,
}

impl Args {
    /// Command-line values win over file and environment values
    fn apply(&self, config: &mut AppConfig) {
        let trading = &mut config.trading;
        if self.dry_run {
            trading.dry_run = true;
        }
        if let Some(strategy) = self.strategy {
            trading.strategy = strategy;
        }
        if let Some(v) = self.min_poll_ms {
            trading.min_poll_ms = v;
        }
        if let Some(v) = self.max_poll_ms {
            trading.max_poll_ms = v;
        }
        if let Some(v) = self.max_buys {
            trading.max_buys = v;
        }
        if let Some(v) = self.max_buys_per_poll {
            trading.max_buys_per_poll = v;
        }
        if let Some(v) = self.max_sales {
            trading.max_sales = v;
        }
        if let Some(v) = self.max_sales_per_poll {
            trading.max_sales_per_poll = v;
        }
        if let Some(level) = &self.log_level {
            config.settings.log_level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let mut config = load_config(Some(&args.config)).context("loading configuration")?;
    apply_credential_env(&mut config);
    args.apply(&mut config);
    validate(&config).context("validating configuration")?;

    // Initialize logging
    let level = match config.settings.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting StockPoller");
    info!("Configuration file: {}", args.config);

    let symbols = universe::resolve(&args.symbols, &config.universes)?;
    if symbols.is_empty() {
        bail!("no symbols were resolved from {:?}", args.symbols);
    }

    let trading = &config.trading;
    info!(
        strategy = %trading.strategy,
        dry_run = trading.dry_run,
        symbols = symbols.len(),
        max_buys = trading.max_buys,
        max_sales = trading.max_sales,
        "Configuration loaded"
    );

    let (trigger, shutdown) = Shutdown::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, cleaning up...");
            trigger.trigger();
        }
    });

    if !trading.dry_run {
        let delay = Duration::from_secs(config.settings.live_warning_delay_seconds);
        warn!(
            "Not in dry-run mode. Real orders will be placed (starting in {}s)",
            delay.as_secs()
        );
        if !shutdown.sleep(delay).await {
            info!("Shutdown requested before trading began");
            return Ok(());
        }
    }

    let client = BrokerageRestClient::connect(&config.brokerage)
        .await
        .context("connecting to brokerage")?;

    let mut poll = PollLoop::from_config(Arc::new(client), trading, shutdown);
    match poll.run(&symbols).await {
        Ok(summary) => {
            info!(
                polls = summary.polls,
                buys = summary.total_buys,
                sales = summary.total_sales,
                failed_orders = summary.failed_orders,
                "Loop has completed: {}",
                summary.stop
            );
            Ok(())
        }
        Err(e) => {
            error!("Polling failed: {}", e);
            Err(e.into())
        }
    }
}
