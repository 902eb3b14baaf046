//! Property-based invariants for `matcher::normalize` (§3.5, §4.4): the
//! normalization used to build the secondary match index must be
//! idempotent and must never introduce whitespace runs, regardless of
//! input.

use proptest::prelude::*;
use skin_arb_engine::engine::matcher::normalize;

proptest! {
    #[test]
    fn normalize_is_idempotent(name in ".{0,64}") {
        let once = normalize(&name);
        let twice = normalize(&once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn normalize_never_leaves_multiple_consecutive_spaces(name in ".{0,64}") {
        let normalized = normalize(&name);
        prop_assert!(!normalized.contains("  "));
    }

    #[test]
    fn normalize_never_leaves_leading_or_trailing_whitespace(name in ".{0,64}") {
        let normalized = normalize(&name);
        prop_assert_eq!(normalized.trim(), normalized.as_str());
    }

    #[test]
    fn fullwidth_punctuation_always_folds_to_halfwidth(
        prefix in "[A-Za-z0-9 ]{0,16}",
        suffix in "[A-Za-z0-9 ]{0,16}",
    ) {
        let input = format!("{prefix}（{suffix}）｜test");
        let normalized = normalize(&input);
        prop_assert!(!normalized.contains('（'));
        prop_assert!(!normalized.contains('）'));
        prop_assert!(!normalized.contains('｜'));
    }

    #[test]
    fn two_inputs_differing_only_by_whitespace_runs_normalize_equal(
        word_a in "[A-Za-z0-9]{1,12}",
        word_b in "[A-Za-z0-9]{1,12}",
        gap_a in 1usize..5,
        gap_b in 1usize..5,
    ) {
        let left = format!("{}{}{}", word_a, " ".repeat(gap_a), word_b);
        let right = format!("{}{}{}", word_a, " ".repeat(gap_b), word_b);
        prop_assert_eq!(normalize(&left), normalize(&right));
    }
}
