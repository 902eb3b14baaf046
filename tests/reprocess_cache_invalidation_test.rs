//! End-to-end Settings → Reprocess → Hash-Name Cache interaction
//! (SPEC_FULL.md §9 open-question resolution, §4.12): an eligibility-
//! changing settings edit must invalidate the Hash-Name Cache, while a
//! diff-window-only edit must leave it untouched. Exercised against a
//! real `Engine` so the wiring between `settings`, `reprocess`, and
//! `hashname_cache` is covered, not just each component in isolation.

use std::sync::Arc;

use skin_arb_engine::engine::reprocess;
use skin_arb_engine::engine::settings::SettingsPatch;
use skin_arb_engine::engine::types::{MatchKind, Opportunity, Platform};
use skin_arb_engine::engine::Engine;
use skin_arb_engine::market_a::MarketAClient;
use skin_arb_engine::market_b::MarketBClient;

fn opp(name: &str, diff: f64) -> Opportunity {
    Opportunity {
        canonical_name: name.into(),
        display_name: name.into(),
        price_a: 10.0,
        price_b: 10.0 + diff,
        listing_count_a: 5,
        match_kind: MatchKind::Exact,
        source_url_a: None,
        source_url_b: None,
        category: None,
        last_updated: 0,
    }
}

fn test_engine() -> Arc<Engine> {
    let dir = std::env::temp_dir().join(format!("reprocess-invalidation-test-{}", uuid::Uuid::new_v4()));
    Arc::new(Engine::new(dir, MarketAClient::new().unwrap(), MarketBClient::new().unwrap()))
}

#[tokio::test]
async fn eligibility_changing_edit_invalidates_the_hashname_cache() {
    let engine = test_engine();
    engine
        .hashname_cache
        .update_from_full_run(&[opp("AK-47 | Redline", 4.0)], 100, 1_700_000_000)
        .await
        .unwrap();
    assert!(!engine.hashname_cache.is_empty().await);

    let patch = SettingsPatch {
        listing_count_min: Some(10),
        ..Default::default()
    };
    // No on-disk snapshots exist, so reprocess falls back to an
    // incremental run; what matters here is only the invalidation.
    reprocess::apply_and_reprocess(&engine, patch).await.unwrap();

    assert!(engine.hashname_cache.is_empty().await);
}

#[tokio::test]
async fn diff_window_only_edit_leaves_the_hashname_cache_intact() {
    let engine = test_engine();
    engine
        .hashname_cache
        .update_from_full_run(&[opp("AK-47 | Redline", 4.0)], 100, 1_700_000_000)
        .await
        .unwrap();

    let patch = SettingsPatch {
        diff_min: Some(2.0),
        diff_max: Some(8.0),
        ..Default::default()
    };
    reprocess::apply_and_reprocess(&engine, patch).await.unwrap();

    assert!(!engine.hashname_cache.is_empty().await);
    let names = engine.hashname_cache.names().await;
    assert_eq!(names, vec!["AK-47 | Redline".to_string()]);
}

#[tokio::test]
async fn invalid_patch_is_rejected_and_cache_is_untouched() {
    let engine = test_engine();
    engine
        .hashname_cache
        .update_from_full_run(&[opp("AWP | Asiimov", 4.0)], 100, 1_700_000_000)
        .await
        .unwrap();

    let before = engine.settings.get();
    let patch = SettingsPatch {
        diff_min: Some(10.0),
        diff_max: Some(1.0),
        ..Default::default()
    };
    let err = reprocess::apply_and_reprocess(&engine, patch).await.unwrap_err();
    assert!(matches!(err, skin_arb_engine::engine::error::EngineError::ConfigInvalid(_)));
    assert_eq!(engine.settings.get(), before);
    assert!(!engine.hashname_cache.is_empty().await);
}

#[tokio::test]
async fn reprocess_reranks_persisted_snapshots_after_a_non_invalidating_edit() {
    let engine = test_engine();

    let item_a = skin_arb_engine::engine::types::Item {
        platform: Platform::A,
        platform_id: "1".into(),
        display_name: "AWP | Asiimov".into(),
        canonical_name: "AWP | Asiimov".into(),
        price: 40.0,
        listing_count: 5,
        image_url: None,
        category: None,
        captured_at: 0,
    };
    let item_b = skin_arb_engine::engine::types::Item {
        platform: Platform::B,
        price: 45.0,
        ..item_a.clone()
    };
    let snapshot_a = skin_arb_engine::engine::types::Snapshot::new(Platform::A, 80, 1, vec![item_a], 0);
    let snapshot_b = skin_arb_engine::engine::types::Snapshot::new(Platform::B, 100, 1, vec![item_b], 0);
    engine.data_store.save_snapshot(&snapshot_a).await.unwrap();
    engine.data_store.save_snapshot(&snapshot_b).await.unwrap();

    engine
        .settings
        .apply_patch(SettingsPatch {
            price_min_a: Some(0.0),
            price_max_a: Some(1000.0),
            listing_count_min: Some(0),
            diff_min: Some(0.0),
            diff_max: Some(1000.0),
            ..Default::default()
        })
        .unwrap();

    let patch = SettingsPatch {
        diff_min: Some(1.0),
        diff_max: Some(10.0),
        ..Default::default()
    };
    let ranked = reprocess::apply_and_reprocess(&engine, patch).await.unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].diff(), 5.0);
}
