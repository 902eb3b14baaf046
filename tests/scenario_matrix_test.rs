//! Scenario matrix from spec.md §8 (S1, S3, S5, S6) exercised through the
//! public `full_pipeline::match_and_filter` entry point — the same
//! function the Full-Update, Streaming, and Reprocess paths all share.
//! S2 and S4 are covered by `full_pipeline`'s own inline test module.

use skin_arb_engine::engine::settings::Settings;
use skin_arb_engine::engine::types::{Item, Platform};
use skin_arb_engine::engine::full_pipeline::match_and_filter;

fn item(platform: Platform, canonical: &str, price: f64, listing_count: u64) -> Item {
    Item {
        platform,
        platform_id: "1".into(),
        display_name: canonical.into(),
        canonical_name: canonical.into(),
        price,
        listing_count,
        image_url: None,
        category: None,
        captured_at: 0,
    }
}

fn wide_open_settings() -> Settings {
    let mut settings = Settings::default();
    settings.price_min_a = 0.0;
    settings.price_max_a = 100_000.0;
    settings.diff_min = 0.0;
    settings.diff_max = 100_000.0;
    settings.listing_count_min = 0;
    settings.max_output_items = 100;
    settings
}

/// S3 — diff below window: B.price=102 against A.price=100 with a
/// [3,5] diff window (diff=2) must be excluded.
#[test]
fn scenario_s3_diff_below_window_is_excluded() {
    let mut settings = wide_open_settings();
    settings.price_min_a = 10.0;
    settings.price_max_a = 1000.0;
    settings.diff_min = 3.0;
    settings.diff_max = 5.0;
    settings.listing_count_min = 1;

    let items_a = vec![item(Platform::A, "X", 100.0, 5)];
    let items_b = vec![item(Platform::B, "X", 102.0, 1)];

    assert!(match_and_filter(&settings, &items_a, &items_b, 0).is_empty());
}

/// S5 — ordering: two qualifying items with profit_rate 15% and 20%
/// must come back with the 20% item first.
#[test]
fn scenario_s5_orders_by_descending_profit_rate() {
    let settings = wide_open_settings();

    let items_a = vec![item(Platform::A, "fifteen", 100.0, 5), item(Platform::A, "twenty", 100.0, 5)];
    let items_b = vec![item(Platform::B, "fifteen", 115.0, 1), item(Platform::B, "twenty", 120.0, 1)];

    let ranked = match_and_filter(&settings, &items_a, &items_b, 0);
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].canonical_name, "twenty");
    assert_eq!(ranked[1].canonical_name, "fifteen");
}

/// S6 — cap: three qualifying items at profit_rate 10/20/30 with
/// max_output_items=2 keep the 30 and 20 items, in that order.
#[test]
fn scenario_s6_caps_to_max_output_items_keeping_the_best() {
    let mut settings = wide_open_settings();
    settings.max_output_items = 2;

    let items_a = vec![
        item(Platform::A, "ten", 100.0, 5),
        item(Platform::A, "twenty", 100.0, 5),
        item(Platform::A, "thirty", 100.0, 5),
    ];
    let items_b = vec![
        item(Platform::B, "ten", 110.0, 1),
        item(Platform::B, "twenty", 120.0, 1),
        item(Platform::B, "thirty", 130.0, 1),
    ];

    let ranked = match_and_filter(&settings, &items_a, &items_b, 0);
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].canonical_name, "thirty");
    assert_eq!(ranked[1].canonical_name, "twenty");
}

/// Boundary behavior (spec.md §8): diff == diff_min/diff_max is included;
/// just outside either edge is excluded.
#[test]
fn diff_window_boundaries_are_inclusive() {
    let mut settings = wide_open_settings();
    settings.diff_min = 3.0;
    settings.diff_max = 5.0;

    let items_a = vec![
        item(Platform::A, "at-min", 100.0, 5),
        item(Platform::A, "at-max", 100.0, 5),
        item(Platform::A, "below-min", 100.0, 5),
        item(Platform::A, "above-max", 100.0, 5),
    ];
    let items_b = vec![
        item(Platform::B, "at-min", 103.0, 1),
        item(Platform::B, "at-max", 105.0, 1),
        item(Platform::B, "below-min", 102.99, 1),
        item(Platform::B, "above-max", 105.01, 1),
    ];

    let ranked = match_and_filter(&settings, &items_a, &items_b, 0);
    let names: Vec<&str> = ranked.iter().map(|o| o.canonical_name.as_str()).collect();
    assert!(names.contains(&"at-min"));
    assert!(names.contains(&"at-max"));
    assert!(!names.contains(&"below-min"));
    assert!(!names.contains(&"above-max"));
}

/// listing_count_a == listing_count_min is included (spec.md §8).
#[test]
fn listing_count_floor_is_inclusive() {
    let mut settings = wide_open_settings();
    settings.listing_count_min = 3;

    let items_a = vec![item(Platform::A, "X", 100.0, 3)];
    let items_b = vec![item(Platform::B, "X", 110.0, 1)];

    assert_eq!(match_and_filter(&settings, &items_a, &items_b, 0).len(), 1);
}
