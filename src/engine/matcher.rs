//! Cross-platform matching (§4.4).
//!
//! Grounded on `original_source/improved_matching.py`'s `ImprovedMatcher`,
//! which tries five tiers in order (exact, normalized, weapon-name,
//! fuzzy, weapon-fuzzy) and records which tier won. The spec keeps only
//! the first two — weapon-name stripping and `SequenceMatcher` similarity
//! scoring are explicitly out of scope, since they can pair items that
//! are cosmetically similar but not the same tradeable good. `normalize`
//! ports `normalize_hash_name` (collapse whitespace, fullwidth-to-halfwidth
//! punctuation); `extract_weapon_name`/`calculate_similarity` are not
//! carried over.

use std::collections::HashMap;

use crate::engine::types::{Item, MatchKind, Opportunity};

/// Collapses runs of whitespace and normalizes fullwidth CJK punctuation
/// to its halfwidth form, mirroring `normalize_hash_name`. Comparison is
/// case-sensitive, matching the original's tier-2 behavior (it lowercases
/// only for the fuzzy tiers this matcher does not implement).
pub fn normalize(name: &str) -> String {
    let collapsed: String = name
        .trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    collapsed.replace('（', "(").replace('）', ")").replace('｜', "|")
}

/// Precomputed lookup from a platform-B snapshot: canonical name to the
/// index of its cheapest listing (rejecting non-positive prices and
/// keeping the lowest-priced duplicate, per the matcher's dedup rule),
/// plus a secondary normalized-name index so tier-2 probes are O(1)
/// instead of scanning every platform-B item per platform-A item.
pub struct MatchIndex {
    exact: HashMap<String, usize>,
    normalized: HashMap<String, Vec<String>>,
}

impl MatchIndex {
    pub fn build(items: &[Item]) -> Self {
        let mut exact: HashMap<String, usize> = HashMap::new();
        for (idx, item) in items.iter().enumerate() {
            if item.price <= 0.0 {
                continue;
            }
            exact
                .entry(item.canonical_name.clone())
                .and_modify(|best| {
                    if item.price < items[*best].price {
                        *best = idx;
                    }
                })
                .or_insert(idx);
        }

        let mut normalized: HashMap<String, Vec<String>> = HashMap::new();
        for name in exact.keys() {
            normalized.entry(normalize(name)).or_default().push(name.clone());
        }
        // `exact.keys()` iterates in HashMap order, which is randomized per
        // process. When two distinct canonical names collapse to the same
        // normalized key, sort candidates by (price, name) so the winner is
        // the same on every rebuild instead of depending on hash iteration
        // order (§8: reprocessing unchanged snapshots must be deterministic).
        for candidates in normalized.values_mut() {
            candidates.sort_by(|a, b| {
                let price_a = items[exact[a]].price;
                let price_b = items[exact[b]].price;
                price_a.partial_cmp(&price_b).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.cmp(b))
            });
        }

        Self { exact, normalized }
    }

    /// Returns the matching item's index in the platform-B snapshot this
    /// index was built from, plus which tier matched. Exact match always
    /// wins; only falls through to normalized match when no exact hit
    /// exists, same order as the original's tier cascade. When several
    /// distinct canonical names share a normalized form, the lowest-priced
    /// one wins, ties broken by name, so the result is stable across index
    /// rebuilds regardless of hash iteration order.
    pub fn find_match(&self, canonical_name: &str) -> Option<(usize, MatchKind)> {
        if let Some(&idx) = self.exact.get(canonical_name) {
            return Some((idx, MatchKind::Exact));
        }
        let normalized_name = normalize(canonical_name);
        let candidates = self.normalized.get(&normalized_name)?;
        let original_name = candidates.first()?;
        let idx = *self.exact.get(original_name)?;
        Some((idx, MatchKind::Normalized))
    }
}

/// Tier counters the Matcher tracks for observability (§4.4: "Matcher
/// tracks counters (exact, normalized, none)").
#[derive(Debug, Default, Clone, Copy)]
pub struct MatchCounters {
    pub exact: usize,
    pub normalized: usize,
    pub none: usize,
}

/// One platform-A item paired with its matched platform-B counterpart.
/// Carries both sides (not just the price) so callers can build an
/// `Opportunity`'s source URLs and category without a second lookup.
pub struct MatchOutcome<'a> {
    pub item_a: &'a Item,
    pub item_b: &'a Item,
    pub kind: MatchKind,
}

/// Probes `index` for every item in `items_a`, returning the matches and
/// the tier counters. `items_a` is typically pre-filtered to the items
/// that already pass the price/listing-count eligibility window (§4.4:
/// "for each Platform A item that passes price and listing-count
/// filters, probes the lookup").
pub fn match_items<'a>(
    items_a: &[&'a Item],
    index: &MatchIndex,
    items_b: &'a [Item],
) -> (Vec<MatchOutcome<'a>>, MatchCounters) {
    let mut counters = MatchCounters::default();
    let mut matches = Vec::with_capacity(items_a.len());

    for &item in items_a {
        match index.find_match(&item.canonical_name) {
            Some((idx, kind)) => {
                match kind {
                    MatchKind::Exact => counters.exact += 1,
                    MatchKind::Normalized => counters.normalized += 1,
                }
                matches.push(MatchOutcome {
                    item_a: item,
                    item_b: &items_b[idx],
                    kind,
                });
            }
            None => counters.none += 1,
        }
    }

    (matches, counters)
}

/// Builds the `Opportunity` candidate for one matched pair. Shared by the
/// Full-Update Pipeline, the Streaming Pipeline, and Reprocess so the
/// field mapping (and the source-URL synthesis) lives in exactly one
/// place.
pub fn to_opportunity(m: &MatchOutcome, now: i64) -> Opportunity {
    Opportunity {
        canonical_name: m.item_a.canonical_name.clone(),
        display_name: m.item_a.display_name.clone(),
        price_a: m.item_a.price,
        price_b: m.item_b.price,
        listing_count_a: m.item_a.listing_count,
        match_kind: m.kind,
        source_url_a: Some(crate::market_a::detail_url(m.item_a)),
        source_url_b: Some(crate::market_b::detail_url(m.item_b)),
        category: m.item_a.category.clone(),
        last_updated: now,
    }
}
