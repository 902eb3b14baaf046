//! Settings & Reprocess (C12, §4.12): after a filter-affecting settings
//! mutation, re-run Matcher + Filter & Ranker against the two most
//! recent on-disk snapshots without refetching anything.
//!
//! Grounded on `original_source/update_manager.py`'s settings-edit path
//! (`AnalysisManager.start_analysis(AnalysisType.MANUAL, ...)` against
//! the last loaded snapshots) and on SPEC_FULL.md §9's resolution of the
//! Hash-Name Cache invalidation question: eligibility-changing edits
//! (`listing_count_min`, `price_min_a`, `price_max_a`) clear the cache so
//! the next full run rebuilds it honestly; diff-window and cap edits
//! leave it alone.

use crate::engine::gate::AnalysisKind;
use crate::engine::settings::SettingsPatch;
use crate::engine::types::Opportunity;
use crate::engine::{error::EngineError, full_pipeline, incremental_pipeline, SharedEngine};
use crate::utils::ts_hm;

/// Applies a settings patch, invalidates the Hash-Name Cache if the
/// patch widened or narrowed eligibility, and triggers Reprocess. The
/// patch itself is rejected (prior settings untouched) on
/// `CONFIG_INVALID` before any reprocessing is attempted.
pub async fn apply_and_reprocess(engine: &SharedEngine, patch: SettingsPatch) -> Result<Vec<Opportunity>, EngineError> {
    let outcome = engine.settings.apply_patch(patch)?;
    if outcome.eligibility_changed {
        engine.hashname_cache.invalidate().await;
        println!("[{}] [REPROCESS] eligibility window changed, hashname cache invalidated", ts_hm());
    }
    run(engine).await
}

/// Re-runs match/filter against the last on-disk snapshots (no network
/// I/O). Falls back to an Incremental run if no snapshots exist yet
/// (§4.12: "never silently enqueue a Full run from a settings edit").
pub async fn run(engine: &SharedEngine) -> Result<Vec<Opportunity>, EngineError> {
    let ticket = match engine.gate.try_start(AnalysisKind::Manual, false).await {
        Some(t) => t,
        None => return Err(EngineError::GateBusy),
    };

    let snapshot_a = engine.data_store.load_snapshot(crate::engine::types::Platform::A).await.map_err(|e| EngineError::Transport(e.to_string()))?;
    let snapshot_b = engine.data_store.load_snapshot(crate::engine::types::Platform::B).await.map_err(|e| EngineError::Transport(e.to_string()))?;

    let (snapshot_a, snapshot_b) = match (snapshot_a, snapshot_b) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            println!("[{}] [REPROCESS] no snapshots on disk, falling back to incremental", ts_hm());
            return incremental_pipeline::run_with_ticket(engine, &ticket).await;
        }
    };

    let settings = engine.settings.get();
    let now = chrono::Utc::now().timestamp();
    let ranked = full_pipeline::match_and_filter(&settings, &snapshot_a.items, &snapshot_b.items, now);

    if let Err(e) = engine.data_store.save_opportunities(&ranked, &settings, now).await {
        eprintln!("[{}] [REPROCESS] failed to save opportunities: {}", ts_hm(), e);
        ticket.finish(None).await;
        return Err(EngineError::Transport(e.to_string()));
    }

    println!("[{}] [REPROCESS] re-ranked {} opportunities from on-disk snapshots", ts_hm(), ranked.len());
    ticket.finish(Some(ranked.clone())).await;
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::settings::Settings;
    use crate::engine::types::{Item, Platform};
    use crate::market_a::MarketAClient;
    use crate::market_b::MarketBClient;
    use std::sync::Arc;

    fn item(platform: Platform, canonical: &str, price: f64) -> Item {
        Item {
            platform,
            platform_id: "1".into(),
            display_name: canonical.into(),
            canonical_name: canonical.into(),
            price,
            listing_count: 5,
            image_url: None,
            category: None,
            captured_at: 0,
        }
    }

    fn test_engine() -> SharedEngine {
        let dir = std::env::temp_dir().join(format!("reprocess-test-{}", uuid::Uuid::new_v4()));
        Arc::new(crate::engine::Engine::new(dir, MarketAClient::new().unwrap(), MarketBClient::new().unwrap()))
    }

    #[tokio::test]
    async fn reprocess_falls_back_to_incremental_with_no_snapshots() {
        let engine = test_engine();
        let result = run(&engine).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn reprocess_reranks_from_on_disk_snapshots() {
        let engine = test_engine();
        let mut settings = Settings::default();
        settings.price_min_a = 0.0;
        settings.price_max_a = 1000.0;
        settings.diff_min = 0.0;
        settings.diff_max = 1000.0;
        settings.listing_count_min = 0;
        engine
            .settings
            .apply_patch(SettingsPatch {
                diff_min: Some(0.0),
                diff_max: Some(1000.0),
                price_min_a: Some(0.0),
                price_max_a: Some(1000.0),
                listing_count_min: Some(0),
                ..Default::default()
            })
            .unwrap();

        let snapshot_a = crate::engine::types::Snapshot::new(Platform::A, 80, 1, vec![item(Platform::A, "X", 10.0)], 0);
        let snapshot_b = crate::engine::types::Snapshot::new(Platform::B, 100, 1, vec![item(Platform::B, "X", 15.0)], 0);
        engine.data_store.save_snapshot(&snapshot_a).await.unwrap();
        engine.data_store.save_snapshot(&snapshot_b).await.unwrap();

        let result = run(&engine).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].diff(), 5.0);
    }
}
