//! Multi-lot recommendation.
//!
//! Compares the observed prices of the lot tiers per unit and picks the tier
//! with the highest unit price. Tiers within 1% of the best count as tied
//! and ties go to the smaller pack.

use std::collections::BTreeMap;

use super::tier::Tier;

/// Relative distance from the best unit price that still counts as a tie.
const TIE_TOLERANCE: f64 = 0.01;

/// Observed price of one tier, reduced to a unit price.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitQuote {
    pub tier: Tier,
    pub raw: u64,
    pub pack_size: u32,
    pub unit_price: f64,
}

/// Unit prices for every tier that has both a price and a usable pack size.
///
/// Tiers with an absent price are left out entirely.
pub fn unit_quotes(
    prices: &BTreeMap<Tier, Option<u64>>,
    pack_sizes: &BTreeMap<Tier, u32>,
) -> Vec<UnitQuote> {
    prices
        .iter()
        .filter_map(|(&tier, &raw)| {
            let raw = raw?;
            let pack_size = *pack_sizes.get(&tier).filter(|&&p| p > 0)?;
            Some(UnitQuote {
                tier,
                raw,
                pack_size,
                unit_price: raw as f64 / f64::from(pack_size),
            })
        })
        .collect()
}

/// Picks the most profitable tier, or `None` if no tier has a price.
pub fn select_best_tier(
    prices: &BTreeMap<Tier, Option<u64>>,
    pack_sizes: &BTreeMap<Tier, u32>,
) -> Option<Tier> {
    let quotes = unit_quotes(prices, pack_sizes);

    let best = quotes
        .iter()
        .map(|q| q.unit_price)
        .fold(f64::NEG_INFINITY, f64::max);

    quotes
        .iter()
        .filter(|q| best - q.unit_price <= TIE_TOLERANCE * best)
        .min_by_key(|q| q.pack_size)
        .map(|q| q.tier)
}
