//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (the API token) are referenced by env-var name in the config
//! and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub scan: ScanConfig,
    pub source: SourceConfig,
    pub budget: BudgetConfig,
    pub thresholds: ThresholdsConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    /// CSV file with the catalog to scan (must have an `item_id` column).
    pub catalog_file: String,
    /// Catalog variant label; scopes the cursor so several catalogs can
    /// be scanned independently. `"all"` is the unscoped default.
    pub variant: String,
    /// `"simple"` or `"parts"`.
    pub mode: String,
    pub batch_size: usize,
    pub pause_between_batches_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    pub api_token_env: String,
    /// Minimum spacing between consecutive API calls.
    pub throttle_ms: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BudgetConfig {
    pub daily_call_limit: u32,
    /// Conservative per-item call estimates used for budget projections.
    pub simple_calls_per_item: u32,
    pub parts_calls_per_item: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ThresholdsConfig {
    pub discount_rate: Decimal,
    pub sell_through_min: Decimal,
    pub part_sell_through_min: Decimal,
    pub min_intl_quantity: u32,
    pub min_intl_price: Decimal,
    pub min_item_price: Decimal,
    pub home_country: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory for cursors, the budget counter and opportunity ledgers.
    pub state_dir: String,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
