//! Shared types for the brickscan engine.
//!
//! These types form the data model used across all modules: marketplace
//! listings, derived price signals, opportunity records, and the small
//! pieces of persisted scan state.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Catalog items and conditions
// ---------------------------------------------------------------------------

/// Category of catalog item on the marketplace.
///
/// Minifigures are the scan targets; parts appear when a minifigure is
/// decomposed into its bill of materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Minifig,
    Part,
}

impl ItemType {
    /// Path segment used by the marketplace API.
    pub fn api_segment(&self) -> &'static str {
        match self {
            ItemType::Minifig => "MINIFIG",
            ItemType::Part => "PART",
        }
    }
}

/// Listing condition. Every catalog item is evaluated once per condition
/// per batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "N")]
    New,
    #[serde(rename = "U")]
    Used,
}

impl Condition {
    /// Both conditions, in the order they are scanned.
    pub const ALL: [Condition; 2] = [Condition::New, Condition::Used];

    /// Wire code used by the marketplace API ("N" / "U").
    pub fn code(&self) -> &'static str {
        match self {
            Condition::New => "N",
            Condition::Used => "U",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// Listings and derived signals
// ---------------------------------------------------------------------------

/// A single marketplace offer. Ephemeral — fetched per query, never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub unit_price: Decimal,
    pub quantity: u32,
    pub seller_country_code: String,
    pub shipping_available: bool,
}

/// Derived lowest-price view for one (item, condition). Computed fresh
/// each evaluation; absent fields mean "no qualifying listing".
#[derive(Debug, Clone, Default)]
pub struct PriceSnapshot {
    pub domestic_price: Option<Decimal>,
    pub international_price: Option<Decimal>,
    pub international_quantity: Option<u32>,
}

/// Ordered sequence of (part id, color id) pairs making up a minifigure.
pub type BillOfMaterials = Vec<(String, u32)>;

// ---------------------------------------------------------------------------
// Opportunity records
// ---------------------------------------------------------------------------

/// Simple-mode finding: a qualifying international listing priced well
/// below the cheapest domestic one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleOpportunity {
    #[serde(rename = "ItemID")]
    pub item_id: String,
    #[serde(rename = "Condition")]
    pub condition: Condition,
    #[serde(rename = "Intl Price")]
    pub intl_price: Decimal,
    #[serde(rename = "US Price")]
    pub us_price: Decimal,
    #[serde(rename = "Intl Quantity")]
    pub intl_quantity: u32,
    #[serde(rename = "Sell Thru Rate")]
    pub sell_through: Decimal,
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Direction of a parts-mode finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartsMode {
    /// Selling the assembled item's components separately.
    Break,
    /// Assembling the item from separately purchased components.
    Build,
}

impl fmt::Display for PartsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartsMode::Break => f.write_str("Break"),
            PartsMode::Build => f.write_str("Build"),
        }
    }
}

/// Parts-mode finding: a whole-item price out of line with the combined
/// price of its constituent parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartsOpportunity {
    #[serde(rename = "ItemID")]
    pub item_id: String,
    #[serde(rename = "Condition")]
    pub condition: Condition,
    #[serde(rename = "Break or Build")]
    pub mode: PartsMode,
    /// Comma-joined part ids that contributed to the combined price.
    #[serde(rename = "Parts Considered")]
    pub parts_considered: String,
    #[serde(rename = "Minifig Price")]
    pub minifig_price: Decimal,
    #[serde(rename = "Minifig Sell Thru Rate")]
    pub minifig_sell_through: Decimal,
    #[serde(rename = "Minifig Quantity")]
    pub minifig_quantity: u32,
    #[serde(rename = "Parts Combined Price")]
    pub parts_combined_price: Decimal,
}

/// Anything stored in an opportunity ledger, keyed on (item id, condition).
/// A later record for the same key replaces the earlier one.
pub trait OpportunityRecord {
    fn item_id(&self) -> &str;
    fn condition(&self) -> Condition;

    fn key(&self) -> (String, Condition) {
        (self.item_id().to_string(), self.condition())
    }
}

impl OpportunityRecord for SimpleOpportunity {
    fn item_id(&self) -> &str {
        &self.item_id
    }
    fn condition(&self) -> Condition {
        self.condition
    }
}

impl OpportunityRecord for PartsOpportunity {
    fn item_id(&self) -> &str {
        &self.item_id
    }
    fn condition(&self) -> Condition {
        self.condition
    }
}

// ---------------------------------------------------------------------------
// Scan state
// ---------------------------------------------------------------------------

/// Persisted (date, count) pair backing the daily call budget. The count
/// is only meaningful while the stored date equals today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetCounter {
    pub date: NaiveDate,
    pub count: u32,
}

/// Outcome of one scanner invocation, reported to the driver so it can
/// distinguish "done for today" from "done with this batch".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Opportunities appended to the ledger this batch.
    pub opportunities_found: usize,
    /// Catalog entries attempted (each under both conditions).
    pub items_attempted: usize,
    /// Outbound API calls measured by the data source this run.
    pub calls_made: u32,
    /// True when the batch stopped early on budget exhaustion. The cursor
    /// points at the interrupted item, which is retried next run.
    pub interrupted: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
