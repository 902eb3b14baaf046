//! Filter & Ranker pipeline stage (§4.5): price window, listing-count
//! floor, and diff window narrow the matched set; stable sort by
//! descending profit rate and a hard cap produce the final output list.
//!
//! Grounded on `original_source/analysis_manager.py`'s post-match
//! filtering (price/diff range checks against `Config`) combined with the
//! teacher's `strategy/opportunity_detector.rs` ranking-then-truncating
//! shape. `sort_by` (not `sort_unstable_by`) is required to preserve
//! input order among equal profit rates, matching the spec's stability
//! invariant.

use crate::engine::settings::Settings;
use crate::engine::types::Opportunity;

pub fn eligible(settings: &Settings, candidate: &Opportunity) -> bool {
    settings.is_price_a_in_range(candidate.price_a)
        && candidate.listing_count_a >= settings.listing_count_min
        && settings.is_diff_in_range(candidate.diff())
}

/// Filters, sorts by descending profit rate (stable), and truncates to
/// `max_output_items`. Consumes its input since nothing downstream needs
/// the rejected rows.
pub fn filter_and_rank(settings: &Settings, candidates: Vec<Opportunity>) -> Vec<Opportunity> {
    let mut kept: Vec<Opportunity> = candidates.into_iter().filter(|c| eligible(settings, c)).collect();
    kept.sort_by(|a, b| {
        b.profit_rate()
            .partial_cmp(&a.profit_rate())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    kept.truncate(settings.max_output_items);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::MatchKind;

    fn opp(canonical: &str, price_a: f64, price_b: f64, listing_count_a: u64) -> Opportunity {
        Opportunity {
            canonical_name: canonical.into(),
            display_name: canonical.into(),
            price_a,
            price_b,
            listing_count_a,
            match_kind: MatchKind::Exact,
            source_url_a: None,
            source_url_b: None,
            category: None,
            last_updated: 0,
        }
    }

    #[test]
    fn drops_items_below_listing_count_floor() {
        let mut settings = Settings::default();
        settings.listing_count_min = 10;
        settings.diff_min = 0.0;
        settings.diff_max = 1000.0;
        settings.price_min_a = 0.0;
        settings.price_max_a = 1000.0;
        let candidates = vec![opp("a", 20.0, 25.0, 3)];
        assert!(filter_and_rank(&settings, candidates).is_empty());
    }

    #[test]
    fn sorts_descending_by_profit_rate_and_is_stable_on_ties() {
        let mut settings = Settings::default();
        settings.diff_min = 0.0;
        settings.diff_max = 1000.0;
        settings.price_min_a = 0.0;
        settings.price_max_a = 1000.0;
        settings.listing_count_min = 0;
        let candidates = vec![
            opp("low", 100.0, 105.0, 5),
            opp("high", 10.0, 20.0, 5),
            opp("tie-first", 50.0, 55.0, 5),
            opp("tie-second", 50.0, 55.0, 5),
        ];
        let ranked = filter_and_rank(&settings, candidates);
        let names: Vec<&str> = ranked.iter().map(|o| o.canonical_name.as_str()).collect();
        assert_eq!(names, vec!["high", "tie-first", "tie-second", "low"]);
    }

    #[test]
    fn truncates_to_max_output_items() {
        let mut settings = Settings::default();
        settings.diff_min = 0.0;
        settings.diff_max = 1000.0;
        settings.price_min_a = 0.0;
        settings.price_max_a = 1000.0;
        settings.listing_count_min = 0;
        settings.max_output_items = 2;
        let candidates = vec![
            opp("a", 10.0, 15.0, 5),
            opp("b", 10.0, 20.0, 5),
            opp("c", 10.0, 25.0, 5),
        ];
        assert_eq!(filter_and_rank(&settings, candidates).len(), 2);
    }
}
