//! Arbitrage decision rules.
//!
//! One evaluation covers a single (item, condition) pair: fetch the
//! correlated guide responses through the injected data source, derive
//! signals (`signals`), and apply the threshold rules. All boundaries are
//! inclusive (`<=` / `>=`).

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::SourceError;
use crate::signals::{self, BuildEstimate, PartSignal};
use crate::source::{GuideFilters, PriceDataSource};
use crate::types::{
    Condition, ItemType, Listing, PartsMode, PartsOpportunity, SimpleOpportunity,
};

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Simple-mode decision thresholds.
#[derive(Debug, Clone)]
pub struct SimpleParams {
    /// Maximum ratio of international to domestic price (0.6 = 60%).
    pub discount_rate: Decimal,
    /// Minimum sell-through rate for the item.
    pub sell_through_min: Decimal,
    /// Minimum quantity on the international listing.
    pub min_intl_quantity: u32,
    /// Price floor for international listings (filters penny noise).
    pub min_intl_price: Decimal,
    /// The requester's home country code.
    pub home_country: String,
}

/// Parts-mode decision thresholds.
#[derive(Debug, Clone)]
pub struct PartsParams {
    pub discount_rate: Decimal,
    /// Item-level sell-through floor (gates the Build candidate).
    pub item_sell_through_min: Decimal,
    /// Part-level sell-through floor (filters the Break sum).
    pub part_sell_through_min: Decimal,
    /// Minimum listing quantity, applied to the whole item (Break) and to
    /// each part (Build).
    pub min_quantity: u32,
    /// Whole-item price floor; cheaper items suppress both candidates.
    pub min_item_price: Decimal,
}

// ---------------------------------------------------------------------------
// Simple mode
// ---------------------------------------------------------------------------

/// Evaluate the simple (domestic vs. international) rule.
///
/// Emits at most one opportunity. Every signal must be present; absence
/// of any of them — including sell-through — suppresses emission.
pub async fn evaluate_simple(
    source: &dyn PriceDataSource,
    item_id: &str,
    condition: Condition,
    params: &SimpleParams,
) -> Result<Option<SimpleOpportunity>, SourceError> {
    let domestic_guide = source
        .price_guide(
            ItemType::Minifig,
            item_id,
            condition,
            &GuideFilters::country(&params.home_country),
        )
        .await?;
    let world_guide = source
        .price_guide(ItemType::Minifig, item_id, condition, &GuideFilters::default())
        .await?;

    let snap = signals::snapshot(
        domestic_guide.as_deref(),
        world_guide.as_deref(),
        &params.home_country,
        params.min_intl_quantity,
        params.min_intl_price,
    );

    let rate = source
        .sell_through_rate(ItemType::Minifig, item_id, condition)
        .await?;

    let (Some(us_price), Some(intl_price), Some(intl_quantity), Some(rate)) = (
        snap.domestic_price,
        snap.international_price,
        snap.international_quantity,
        rate,
    ) else {
        return Ok(None);
    };

    if intl_price <= params.discount_rate * us_price
        && rate >= params.sell_through_min
        && intl_quantity >= params.min_intl_quantity
    {
        debug!(
            item_id,
            condition = %condition,
            %intl_price,
            %us_price,
            "Simple arbitrage hit"
        );
        return Ok(Some(SimpleOpportunity {
            item_id: item_id.to_string(),
            condition,
            intl_price: intl_price.round_dp(2),
            us_price: us_price.round_dp(2),
            intl_quantity,
            sell_through: rate.round_dp(2),
            timestamp: Utc::now(),
        }));
    }

    Ok(None)
}

// ---------------------------------------------------------------------------
// Parts mode
// ---------------------------------------------------------------------------

/// Evaluate the parts (Break / Build) rules.
///
/// Both candidates are evaluated independently, so zero, one, or two
/// records come back. A missing whole-item sell-through rate, an empty
/// whole-item guide, or a first listing below the price floor suppresses
/// both.
pub async fn evaluate_parts(
    source: &dyn PriceDataSource,
    item_id: &str,
    condition: Condition,
    params: &PartsParams,
) -> Result<Vec<PartsOpportunity>, SourceError> {
    let item_rate = source
        .sell_through_rate(ItemType::Minifig, item_id, condition)
        .await?;

    // A failed subsets fetch is fatal for this item's evaluation (raised,
    // caught at the scanner's per-item boundary); an empty bill is fine.
    let bill = source.bill_of_materials(item_id).await?;

    let whole_guide = source
        .price_guide(ItemType::Minifig, item_id, condition, &GuideFilters::default())
        .await?;

    let mut part_listings: Vec<(String, Option<Vec<Listing>>)> =
        Vec::with_capacity(bill.len());
    for (part_id, color_id) in &bill {
        let listings = source
            .price_guide(
                ItemType::Part,
                part_id,
                condition,
                &GuideFilters::color(*color_id),
            )
            .await?;
        part_listings.push((part_id.clone(), listings));
    }

    // Gate both candidates on a usable whole-item signal.
    let Some(whole) = whole_guide.as_deref().filter(|w| !w.is_empty()) else {
        return Ok(Vec::new());
    };
    if whole[0].unit_price < params.min_item_price {
        return Ok(Vec::new());
    }
    let Some(item_rate) = item_rate else {
        return Ok(Vec::new());
    };

    let mut findings = Vec::new();

    // -- Break: sell the parts instead of the whole item -----------------
    // Only the first (cheapest) whole-item listing is ever considered.
    let first = &whole[0];
    if first.quantity >= params.min_quantity {
        let mut part_signals = Vec::with_capacity(part_listings.len());
        for (part_id, listings) in &part_listings {
            let cheapest = listings
                .as_deref()
                .and_then(|l| l.first())
                .map(|l| l.unit_price);
            // Sell-through is only worth two calls for parts that are
            // actually listed.
            let sell_through = if cheapest.is_some() {
                source
                    .sell_through_rate(ItemType::Part, part_id, condition)
                    .await?
            } else {
                None
            };
            part_signals.push(PartSignal {
                part_id: part_id.clone(),
                cheapest_price: cheapest,
                sell_through,
            });
        }

        let (parts_value, considered) =
            signals::break_value(&part_signals, params.part_sell_through_min);

        if first.unit_price <= params.discount_rate * parts_value {
            debug!(item_id, condition = %condition, %parts_value, "Break arbitrage hit");
            findings.push(PartsOpportunity {
                item_id: item_id.to_string(),
                condition,
                mode: PartsMode::Break,
                parts_considered: considered.join(", "),
                minifig_price: first.unit_price.round_dp(2),
                minifig_sell_through: item_rate.round_dp(2),
                minifig_quantity: first.quantity,
                parts_combined_price: parts_value.round_dp(2),
            });
        }
    }

    // -- Build: assemble the item from parts ------------------------------
    let item_price = whole[0].unit_price;
    if item_rate >= params.item_sell_through_min {
        if let BuildEstimate::Complete { total, parts_used } =
            signals::build_cost(&part_listings, params.min_quantity)
        {
            if total > Decimal::ZERO && total <= params.discount_rate * item_price {
                debug!(item_id, condition = %condition, %total, "Build arbitrage hit");
                findings.push(PartsOpportunity {
                    item_id: item_id.to_string(),
                    condition,
                    mode: PartsMode::Build,
                    parts_considered: parts_used.join(", "),
                    minifig_price: item_price.round_dp(2),
                    minifig_sell_through: item_rate.round_dp(2),
                    minifig_quantity: params.min_quantity,
                    parts_combined_price: total.round_dp(2),
                });
            }
        }
    }

    Ok(findings)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
