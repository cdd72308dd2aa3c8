//! Mock data source for integration testing.
//!
//! Provides a deterministic `PriceDataSource` implementation that
//! returns known price guides, sell-through rates and part bills, and
//! counts every call — all in-memory with no external dependencies.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use brickscan::error::SourceError;
use brickscan::source::{GuideFilters, PriceDataSource};
use brickscan::types::{BillOfMaterials, Condition, ItemType, Listing};

type GuideKey = (ItemType, String, Option<String>, Option<u32>);

/// A mock marketplace data source for deterministic testing.
///
/// Fixtures answer identically for both conditions. Call accounting
/// mirrors the real client: one call per guide fetch, two per
/// sell-through rate, one per bill of materials. An optional trip point
/// makes the Nth call (and every call after it) fail with the typed
/// budget fault, the way the live API answers 429 once the daily quota
/// is gone.
pub struct MockSource {
    guides: HashMap<GuideKey, Vec<Listing>>,
    rates: HashMap<(ItemType, String), Decimal>,
    bills: HashMap<String, BillOfMaterials>,
    calls: AtomicU32,
    budget_trip_at: Option<u32>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            guides: HashMap::new(),
            rates: HashMap::new(),
            bills: HashMap::new(),
            calls: AtomicU32::new(0),
            budget_trip_at: None,
        }
    }

    /// Install a guide for (type, id) under the given country/color
    /// filters.
    pub fn with_guide(
        mut self,
        item_type: ItemType,
        item_id: &str,
        country: Option<&str>,
        color: Option<u32>,
        listings: Vec<Listing>,
    ) -> Self {
        self.guides.insert(
            (item_type, item_id.to_string(), country.map(String::from), color),
            listings,
        );
        self
    }

    pub fn with_rate(mut self, item_type: ItemType, item_id: &str, rate: Decimal) -> Self {
        self.rates.insert((item_type, item_id.to_string()), rate);
        self
    }

    pub fn with_bill(mut self, item_id: &str, bill: BillOfMaterials) -> Self {
        self.bills.insert(item_id.to_string(), bill);
        self
    }

    /// An item priced so the simple rule fires: 10.00 domestic against
    /// 4.00 international with healthy sell-through.
    pub fn with_simple_hit(self, item_id: &str) -> Self {
        self.with_guide(
            ItemType::Minifig,
            item_id,
            Some("US"),
            None,
            vec![listing(dec!(10.00), 1, "US")],
        )
        .with_guide(
            ItemType::Minifig,
            item_id,
            None,
            None,
            vec![listing(dec!(4.00), 3, "DE")],
        )
        .with_rate(ItemType::Minifig, item_id, dec!(0.5))
    }

    /// An item with full data whose international price is too high to
    /// qualify.
    pub fn with_simple_miss(self, item_id: &str) -> Self {
        self.with_guide(
            ItemType::Minifig,
            item_id,
            Some("US"),
            None,
            vec![listing(dec!(10.00), 1, "US")],
        )
        .with_guide(
            ItemType::Minifig,
            item_id,
            None,
            None,
            vec![listing(dec!(9.00), 3, "DE")],
        )
        .with_rate(ItemType::Minifig, item_id, dec!(0.5))
    }

    /// Fail the Nth call and every later one with the budget fault.
    pub fn with_budget_trip_at(mut self, call: u32) -> Self {
        self.budget_trip_at = Some(call);
        self
    }

    fn record_call(&self) -> Result<(), SourceError> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(trip) = self.budget_trip_at {
            if n >= trip {
                return Err(SourceError::BudgetExceeded);
            }
        }
        Ok(())
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceDataSource for MockSource {
    async fn sell_through_rate(
        &self,
        item_type: ItemType,
        item_id: &str,
        _condition: Condition,
    ) -> Result<Option<Decimal>, SourceError> {
        // Sold guide + stock guide.
        self.record_call()?;
        self.record_call()?;
        Ok(self.rates.get(&(item_type, item_id.to_string())).copied())
    }

    async fn price_guide(
        &self,
        item_type: ItemType,
        item_id: &str,
        _condition: Condition,
        filters: &GuideFilters,
    ) -> Result<Option<Vec<Listing>>, SourceError> {
        self.record_call()?;
        let key = (
            item_type,
            item_id.to_string(),
            filters.country_code.clone(),
            filters.color_id,
        );
        Ok(self.guides.get(&key).filter(|l| !l.is_empty()).cloned())
    }

    async fn bill_of_materials(&self, item_id: &str) -> Result<BillOfMaterials, SourceError> {
        self.record_call()?;
        self.bills
            .get(item_id)
            .cloned()
            .ok_or_else(|| SourceError::Http {
                status: 404,
                context: format!("subsets {item_id}"),
            })
    }

    fn calls_made(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }

    fn reset_calls(&self) {
        self.calls.store(0, Ordering::Relaxed);
    }
}

pub fn listing(price: Decimal, quantity: u32, country: &str) -> Listing {
    Listing {
        unit_price: price,
        quantity,
        seller_country_code: country.to_string(),
        shipping_available: true,
    }
}
