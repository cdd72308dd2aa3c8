//! BrickLink store API integration.
//!
//! Rate-limited client for the price-guide and subsets endpoints.
//! Base URL: https://api.bricklink.com/api/store/v1
//! Quota: 5000 requests/day per account — a 429 maps to the typed
//! `BudgetExceeded` fault so the scanner can interrupt cleanly.
//!
//! Authentication is opaque to the engine: the caller injects a
//! ready-to-send `Authorization` header value.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::{GuideFilters, PriceDataSource};
use crate::error::SourceError;
use crate::types::{BillOfMaterials, Condition, ItemType, Listing};

const DEFAULT_BASE_URL: &str = "https://api.bricklink.com/api/store/v1";
const CURRENCY: &str = "USD";

// ---------------------------------------------------------------------------
// API response types (BrickLink JSON → Rust)
// ---------------------------------------------------------------------------

/// Every BrickLink response wraps its payload in `{ meta, data }`.
/// A missing `data` field deserializes to `None`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

/// Price-guide payload. We only deserialize the fields we need.
#[derive(Debug, Deserialize)]
struct PriceGuideData {
    #[serde(default)]
    total_quantity: u32,
    #[serde(default)]
    price_detail: Vec<PriceDetail>,
}

/// One tier of the price guide. Prices come over the wire as strings
/// ("6.0000").
#[derive(Debug, Deserialize)]
struct PriceDetail {
    #[serde(default)]
    unit_price: String,
    #[serde(default)]
    quantity: u32,
    #[serde(default)]
    seller_country_code: String,
    #[serde(default)]
    shipping_available: bool,
}

#[derive(Debug, Deserialize)]
struct Subset {
    #[serde(default)]
    entries: Vec<SubsetEntry>,
}

#[derive(Debug, Deserialize)]
struct SubsetEntry {
    #[serde(default)]
    item: Option<SubsetItem>,
    #[serde(default)]
    color_id: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SubsetItem {
    #[serde(default)]
    no: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Rate-limited BrickLink client.
///
/// Every outbound call increments the run-scoped counter and is followed
/// by an unconditional throttle pause — the sole concurrency-control
/// mechanism. Requests are issued sequentially by the single-threaded
/// scanner, so plain atomics are all the synchronisation needed.
pub struct BrickLinkClient {
    http: Client,
    base_url: String,
    auth_header: SecretString,
    throttle: Duration,
    calls: AtomicU32,
}

impl BrickLinkClient {
    /// Create a client with an injected `Authorization` header value.
    pub fn new(
        auth_header: SecretString,
        base_url: Option<String>,
        throttle: Duration,
        request_timeout: Duration,
    ) -> Result<Self, SourceError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .user_agent("brickscan/0.1.0 (arbitrage-scanner)")
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            auth_header,
            throttle,
            calls: AtomicU32::new(0),
        })
    }

    /// Issue one GET, counting the call and pausing for the throttle
    /// delay before handing the response back. 429 becomes the typed
    /// budget fault.
    async fn get(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<reqwest::Response, SourceError> {
        let url = format!("{}/{path}", self.base_url);
        self.calls.fetch_add(1, Ordering::Relaxed);

        let resp = self
            .http
            .get(&url)
            .header("Authorization", self.auth_header.expose_secret())
            .query(params)
            .send()
            .await?;

        tokio::time::sleep(self.throttle).await;

        if resp.status().as_u16() == 429 {
            return Err(SourceError::BudgetExceeded);
        }
        Ok(resp)
    }

    /// Fetch one price guide and return its payload, or `None` on a
    /// non-success status (transient per-item failure).
    async fn fetch_guide(
        &self,
        item_type: ItemType,
        item_id: &str,
        condition: Condition,
        guide_type: &str,
        filters: &GuideFilters,
    ) -> Result<Option<PriceGuideData>, SourceError> {
        let path = format!("items/{}/{item_id}/price", item_type.api_segment());
        let mut params = vec![
            ("new_or_used", condition.code().to_string()),
            ("currency_code", CURRENCY.to_string()),
            ("guide_type", guide_type.to_string()),
        ];
        if let Some(country) = &filters.country_code {
            params.push(("country_code", country.clone()));
        }
        if let Some(color) = filters.color_id {
            params.push(("color_id", color.to_string()));
        }

        let resp = self.get(&path, &params).await?;
        if !resp.status().is_success() {
            warn!(
                item_id,
                condition = %condition,
                guide_type,
                status = resp.status().as_u16(),
                "Price guide request failed"
            );
            return Ok(None);
        }

        let envelope: Envelope<PriceGuideData> = resp.json().await?;
        Ok(envelope.data)
    }
}

/// Parse a wire price string into a `Decimal`.
fn parse_price(raw: &str) -> Result<Decimal, SourceError> {
    Decimal::from_str(raw)
        .map_err(|_| SourceError::Decode(format!("unparseable unit_price {raw:?}")))
}

#[async_trait]
impl PriceDataSource for BrickLinkClient {
    async fn sell_through_rate(
        &self,
        item_type: ItemType,
        item_id: &str,
        condition: Condition,
    ) -> Result<Option<Decimal>, SourceError> {
        let no_filters = GuideFilters::default();

        let Some(sold) = self
            .fetch_guide(item_type, item_id, condition, "sold", &no_filters)
            .await?
        else {
            return Ok(None);
        };
        let Some(stock) = self
            .fetch_guide(item_type, item_id, condition, "stock", &no_filters)
            .await?
        else {
            return Ok(None);
        };

        if stock.total_quantity == 0 {
            return Ok(None);
        }
        Ok(Some(
            Decimal::from(sold.total_quantity) / Decimal::from(stock.total_quantity),
        ))
    }

    async fn price_guide(
        &self,
        item_type: ItemType,
        item_id: &str,
        condition: Condition,
        filters: &GuideFilters,
    ) -> Result<Option<Vec<Listing>>, SourceError> {
        let Some(guide) = self
            .fetch_guide(item_type, item_id, condition, "stock", filters)
            .await?
        else {
            return Ok(None);
        };

        let mut listings = Vec::with_capacity(guide.price_detail.len());
        for tier in guide.price_detail {
            if !tier.shipping_available {
                continue;
            }
            listings.push(Listing {
                unit_price: parse_price(&tier.unit_price)?,
                quantity: tier.quantity,
                seller_country_code: tier.seller_country_code,
                shipping_available: true,
            });
        }

        if listings.is_empty() {
            debug!(item_id, condition = %condition, "No shippable listings");
            return Ok(None);
        }

        // Stable ascending sort so the first qualifying match downstream
        // is the global qualifying minimum.
        listings.sort_by(|a, b| a.unit_price.cmp(&b.unit_price));

        debug!(
            item_id,
            condition = %condition,
            count = listings.len(),
            "Listings fetched"
        );
        Ok(Some(listings))
    }

    async fn bill_of_materials(&self, item_id: &str) -> Result<BillOfMaterials, SourceError> {
        let path = format!("items/MINIFIG/{item_id}/subsets");
        let params = [("break_minifigs", "true".to_string())];

        let resp = self.get(&path, &params).await?;
        if !resp.status().is_success() {
            // An empty bill is valid; a failed fetch is not.
            return Err(SourceError::Http {
                status: resp.status().as_u16(),
                context: format!("subsets {item_id}"),
            });
        }

        let envelope: Envelope<Vec<Subset>> = resp.json().await?;
        let subsets = envelope.data.unwrap_or_default();

        let mut parts = Vec::new();
        for subset in subsets {
            for entry in subset.entries {
                let no = entry.item.and_then(|i| i.no);
                if let (Some(no), Some(color_id)) = (no, entry.color_id) {
                    parts.push((no, color_id));
                }
            }
        }
        Ok(parts)
    }

    fn calls_made(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }

    fn reset_calls(&self) {
        self.calls.store(0, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
