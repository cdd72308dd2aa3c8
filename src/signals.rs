//! Price signal calculation.
//!
//! Pure functions that derive arbitrage signals from already-fetched,
//! ascending-sorted listing data. Nothing here touches the network, which
//! is what keeps the decision rules unit-testable.

use rust_decimal::Decimal;

use crate::types::{Listing, PriceSnapshot};

// ---------------------------------------------------------------------------
// Simple-mode signals
// ---------------------------------------------------------------------------

/// Cheapest domestic price: the first listing of a home-country-filtered
/// guide. `None` when the guide came back absent or empty.
pub fn domestic_price(listings: Option<&[Listing]>) -> Option<Decimal> {
    listings?.first().map(|l| l.unit_price)
}

/// Cheapest qualifying international price.
///
/// Listings are scanned in ascending-price order, so the first listing
/// whose seller country differs from home AND meets the quantity and
/// price floors is the global minimum among qualifying listings.
pub fn international_price(
    listings: &[Listing],
    home_country: &str,
    min_quantity: u32,
    min_price: Decimal,
) -> Option<(Decimal, u32)> {
    listings
        .iter()
        .find(|l| {
            l.seller_country_code != home_country
                && l.quantity >= min_quantity
                && l.unit_price >= min_price
        })
        .map(|l| (l.unit_price, l.quantity))
}

/// Combine both lowest-price views into one snapshot.
pub fn snapshot(
    domestic_listings: Option<&[Listing]>,
    all_listings: Option<&[Listing]>,
    home_country: &str,
    min_intl_quantity: u32,
    min_intl_price: Decimal,
) -> PriceSnapshot {
    let intl = all_listings.and_then(|listings| {
        international_price(listings, home_country, min_intl_quantity, min_intl_price)
    });
    PriceSnapshot {
        domestic_price: domestic_price(domestic_listings),
        international_price: intl.map(|(p, _)| p),
        international_quantity: intl.map(|(_, q)| q),
    }
}

// ---------------------------------------------------------------------------
// Parts-mode signals
// ---------------------------------------------------------------------------

/// Result of pricing a full build from parts. No partial totals: one part
/// with listings but none meeting the quantity floor fails the whole
/// estimate.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildEstimate {
    Complete {
        total: Decimal,
        parts_used: Vec<String>,
    },
    /// Some part had listings but none with sufficient quantity.
    Missing,
}

/// Total cost of buying one of each part.
///
/// Per part, the cheapest listing with `quantity >= min_quantity` wins.
/// Parts with no listings at all are skipped, matching the whole-item
/// guide behavior where an unlisted part simply contributes no signal.
pub fn build_cost(
    part_listings: &[(String, Option<Vec<Listing>>)],
    min_quantity: u32,
) -> BuildEstimate {
    let mut total = Decimal::ZERO;
    let mut parts_used = Vec::new();

    for (part_id, listings) in part_listings {
        let Some(listings) = listings.as_deref().filter(|l| !l.is_empty()) else {
            continue;
        };
        match listings.iter().find(|l| l.quantity >= min_quantity) {
            Some(listing) => {
                total += listing.unit_price;
                parts_used.push(part_id.clone());
            }
            None => return BuildEstimate::Missing,
        }
    }

    BuildEstimate::Complete { total, parts_used }
}

/// One part's gathered signals for break-value calculation.
#[derive(Debug, Clone)]
pub struct PartSignal {
    pub part_id: String,
    /// Cheapest listed price, when the part has any shippable listing.
    pub cheapest_price: Option<Decimal>,
    pub sell_through: Option<Decimal>,
}

/// Value of breaking the item into parts: sum of cheapest listing price
/// per part, restricted to parts whose sell-through meets the part-level
/// threshold. Excluded parts appear in neither the sum nor the returned
/// list.
pub fn break_value(parts: &[PartSignal], part_sell_through_min: Decimal) -> (Decimal, Vec<String>) {
    let mut total = Decimal::ZERO;
    let mut considered = Vec::new();

    for part in parts {
        let (Some(price), Some(rate)) = (part.cheapest_price, part.sell_through) else {
            continue;
        };
        if rate >= part_sell_through_min {
            total += price;
            considered.push(part.part_id.clone());
        }
    }

    (total, considered)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
