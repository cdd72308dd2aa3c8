//! BRICKSCAN — Marketplace Price Arbitrage Scanner
//!
//! Entry point. Loads configuration, initialises structured logging,
//! builds the API client and state store, and runs batch→pause→batch
//! until the catalog cycle completes for the day, the daily call budget
//! runs out, or a shutdown signal arrives.

use anyhow::{bail, Result};
use secrecy::SecretString;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use brickscan::catalog::Catalog;
use brickscan::config::AppConfig;
use brickscan::scanner::{BatchScanner, ScanMode};
use brickscan::source::bricklink::BrickLinkClient;
use brickscan::evaluator::{PartsParams, SimpleParams};
use brickscan::storage::FileStore;

const BANNER: &str = r#"
 ____  ____  ___ ____ _  ______   ____    _    _   _
| __ )|  _ \|_ _/ ___| |/ / ___| / ___|  / \  | \ | |
|  _ \| |_) || | |   | ' /\___ \| |     / _ \ |  \| |
| |_) |  _ < | | |___| . \ ___) | |___ / ___ \| |\  |
|____/|_| \_\___\____|_|\_\____/ \____/_/   \_\_| \_|

  Minifig Price Arbitrage Scanner
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    println!("{BANNER}");
    info!(
        variant = %cfg.scan.variant,
        mode = %cfg.scan.mode,
        batch_size = cfg.scan.batch_size,
        daily_call_limit = cfg.budget.daily_call_limit,
        "BRICKSCAN starting up"
    );

    // -- Initialise components -------------------------------------------

    let catalog = Catalog::from_csv(Path::new(&cfg.scan.catalog_file))?;
    let store = FileStore::new(&cfg.storage.state_dir)?;

    let auth_header = SecretString::new(AppConfig::resolve_env(&cfg.source.api_token_env)?);
    let source = BrickLinkClient::new(
        auth_header,
        Some(cfg.source.base_url.clone()),
        Duration::from_millis(cfg.source.throttle_ms),
        Duration::from_secs(cfg.source.request_timeout_secs),
    )?;

    let (mode, calls_per_item) = match cfg.scan.mode.as_str() {
        "simple" => (
            ScanMode::Simple(SimpleParams {
                discount_rate: cfg.thresholds.discount_rate,
                sell_through_min: cfg.thresholds.sell_through_min,
                min_intl_quantity: cfg.thresholds.min_intl_quantity,
                min_intl_price: cfg.thresholds.min_intl_price,
                home_country: cfg.thresholds.home_country.clone(),
            }),
            cfg.budget.simple_calls_per_item,
        ),
        "parts" => (
            ScanMode::Parts(PartsParams {
                discount_rate: cfg.thresholds.discount_rate,
                item_sell_through_min: cfg.thresholds.sell_through_min,
                part_sell_through_min: cfg.thresholds.part_sell_through_min,
                min_quantity: cfg.thresholds.min_intl_quantity,
                min_item_price: cfg.thresholds.min_item_price,
            }),
            cfg.budget.parts_calls_per_item,
        ),
        other => bail!("Unknown scan mode in config: {other}"),
    };

    let scanner = BatchScanner::new(
        &source,
        &store,
        &catalog,
        mode,
        cfg.scan.variant.clone(),
        cfg.scan.batch_size,
        calls_per_item,
        cfg.budget.daily_call_limit,
    );

    // -- Main loop -------------------------------------------------------

    let pause = Duration::from_secs(cfg.scan.pause_between_batches_secs);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut total_found = 0usize;
    let mut total_items = 0usize;
    let mut batches = 0usize;

    info!(
        pause_secs = cfg.scan.pause_between_batches_secs,
        "Entering scan loop. Press Ctrl+C to stop."
    );

    loop {
        let outcome = tokio::select! {
            result = scanner.run_batch() => result?,
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        };

        batches += 1;
        total_found += outcome.opportunities_found;
        total_items += outcome.items_attempted;

        if outcome.interrupted {
            warn!("Daily call budget exhausted — done until tomorrow.");
            break;
        }
        if total_items >= catalog.len() {
            info!("Full catalog pass complete.");
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    info!(
        batches,
        items = total_items,
        opportunities = total_found,
        "BRICKSCAN shut down cleanly."
    );

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("brickscan=info"));

    let json_logging = std::env::var("BRICKSCAN_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
