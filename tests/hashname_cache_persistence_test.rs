//! Hash-Name Cache persistence across process restarts (§4.6): a cache
//! built by one `HashNameCache` instance must be fully recoverable by a
//! fresh instance pointed at the same path, the way the engine's real
//! startup path (`HashNameCache::new` then `.load()`) behaves across a
//! restart.

use skin_arb_engine::engine::hashname_cache::HashNameCache;
use skin_arb_engine::engine::types::{MatchKind, Opportunity};

fn opp(name: &str, diff: f64) -> Opportunity {
    Opportunity {
        canonical_name: name.into(),
        display_name: name.into(),
        price_a: 10.0,
        price_b: 10.0 + diff,
        listing_count_a: 1,
        match_kind: MatchKind::Exact,
        source_url_a: None,
        source_url_b: None,
        category: None,
        last_updated: 0,
    }
}

fn temp_cache_path() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("hashname-cache-persist-test-{}", uuid::Uuid::new_v4())).join("cache.bin")
}

#[tokio::test]
async fn survives_a_fresh_instance_pointed_at_the_same_path() {
    let path = temp_cache_path();

    let writer = HashNameCache::new(path.clone());
    writer
        .update_from_full_run(&[opp("AK-47 | Redline", 4.0), opp("AWP | Asiimov", 3.5)], 10, 1_700_000_000)
        .await
        .unwrap();

    let reader = HashNameCache::new(path);
    assert!(reader.is_empty().await);
    reader.load().await.unwrap();

    let mut names = reader.names().await;
    names.sort();
    assert_eq!(names, vec!["AK-47 | Redline".to_string(), "AWP | Asiimov".to_string()]);
    assert!(!reader.is_due_for_full_update(3600).await);
}

#[tokio::test]
async fn loading_a_nonexistent_file_leaves_the_cache_empty_not_an_error() {
    let path = temp_cache_path();
    let cache = HashNameCache::new(path);
    cache.load().await.unwrap();
    assert!(cache.is_empty().await);
    assert!(cache.is_due_for_full_update(3600).await);
}
