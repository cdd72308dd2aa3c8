//! Price/sales data sources.
//!
//! Defines the `PriceDataSource` trait — the injected capability the scan
//! engine consumes — and the rate-limited BrickLink HTTP implementation.
//! Every implementation carries its own run-scoped call counter so the
//! budget tracker can record what a batch actually spent.

pub mod bricklink;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::SourceError;
use crate::types::{BillOfMaterials, Condition, ItemType, Listing};

/// Optional filters on a price-guide query.
#[derive(Debug, Clone, Default)]
pub struct GuideFilters {
    /// Restrict listings to sellers in this country.
    pub country_code: Option<String>,
    /// Restrict listings to one color (parts only).
    pub color_id: Option<u32>,
}

impl GuideFilters {
    pub fn country(code: &str) -> Self {
        Self {
            country_code: Some(code.to_string()),
            ..Self::default()
        }
    }

    pub fn color(color_id: u32) -> Self {
        Self {
            color_id: Some(color_id),
            ..Self::default()
        }
    }
}

/// Abstraction over the marketplace price/sales API.
///
/// Implementors enforce their own request throttle and count every
/// outbound call. All faults surface as `SourceError`; the scanner only
/// inspects the `BudgetExceeded` variant.
#[async_trait]
pub trait PriceDataSource: Send + Sync {
    /// Ratio of units sold (trailing window) to units currently stocked.
    ///
    /// Issues two calls (sold guide, stock guide). `None` when the stock
    /// quantity is zero or either call answers non-success — absence is a
    /// hard "cannot evaluate" signal, never zero.
    async fn sell_through_rate(
        &self,
        item_type: ItemType,
        item_id: &str,
        condition: Condition,
    ) -> Result<Option<Decimal>, SourceError>;

    /// Current stock listings, filtered to shipping-available and sorted
    /// ascending by unit price (stable on ties). `None` when the call
    /// fails or the filtered set is empty.
    async fn price_guide(
        &self,
        item_type: ItemType,
        item_id: &str,
        condition: Condition,
        filters: &GuideFilters,
    ) -> Result<Option<Vec<Listing>>, SourceError>;

    /// Sub-part breakdown of a minifigure, with figure-breaking enabled.
    ///
    /// An empty bill is a valid result; an HTTP failure is an error.
    async fn bill_of_materials(&self, item_id: &str) -> Result<BillOfMaterials, SourceError>;

    /// Outbound calls made since construction (or the last reset).
    fn calls_made(&self) -> u32;

    /// Reset the run-scoped counter at the start of a batch.
    fn reset_calls(&self);
}
