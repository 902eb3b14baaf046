//! Full-Update Pipeline (§4.8): the hourly two-platform crawl that
//! rebuilds snapshots, the opportunity list, and the Hash-Name Cache from
//! scratch.
//!
//! Grounded on `original_source/update_manager.py`'s
//! `_trigger_full_update`/`_run_full_analysis` (concurrent two-platform
//! fetch, matcher+filter, hashname cache rebuild) and the teacher's
//! `src/main.rs` fan-out pattern of spawning one task per exchange
//! connector and joining them, here via `tokio::try_join!` instead of
//! `tokio::spawn` since both fetches must complete (or both abort)
//! before the run can proceed.

use crate::engine::gate::AnalysisKind;
use crate::engine::matcher::{match_items, to_opportunity, MatchIndex};
use crate::engine::settings::Settings;
use crate::engine::types::{Item, Opportunity, Snapshot};
use crate::engine::{error::EngineError, filter, SharedEngine};
use crate::utils::ts_hm;

/// Runs the full crawl → match → filter → persist → refresh-cache
/// sequence. Returns the ranked opportunity list on success. A
/// `GateBusy`/`Cancelled` result means no shared state was touched.
pub async fn run(engine: &SharedEngine) -> Result<Vec<Opportunity>, EngineError> {
    let ticket = match engine.gate.try_start(AnalysisKind::Full, true).await {
        Some(t) => t,
        None => return Err(EngineError::GateBusy),
    };

    let settings = engine.settings.get();
    let stop_a = {
        let ticket = &ticket;
        move || ticket.should_stop()
    };
    let stop_b = {
        let ticket = &ticket;
        move || ticket.should_stop()
    };

    println!("[{}] [FULL PIPELINE] starting crawl", ts_hm());

    let fetch_a = engine.market_a.fetch_snapshot(
        &engine.credentials,
        &engine.rate_limiter_a,
        settings.page_size_a,
        settings.max_pages_a,
        stop_a,
    );
    let fetch_b = engine.market_b.fetch_snapshot(
        &engine.credentials,
        &engine.rate_limiter_b,
        settings.page_size_b,
        settings.max_pages_b,
        stop_b,
    );

    let (items_a, items_b) = match tokio::try_join!(fetch_a, fetch_b) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("[{}] [FULL PIPELINE] aborted, partial snapshot: {}", ts_hm(), e);
            ticket.finish(None).await;
            return Err(EngineError::PartialSnapshot("A or B"));
        }
    };

    if ticket.should_stop() {
        println!("[{}] [FULL PIPELINE] cancelled after fetch", ts_hm());
        ticket.finish(None).await;
        return Err(EngineError::Cancelled);
    }

    let now = chrono::Utc::now().timestamp();
    let snapshot_a = Snapshot::new(crate::engine::types::Platform::A, settings.page_size_a, settings.max_pages_a, items_a.clone(), now);
    let snapshot_b = Snapshot::new(crate::engine::types::Platform::B, settings.page_size_b, settings.max_pages_b, items_b.clone(), now);

    if let Err(e) = engine.data_store.save_snapshot(&snapshot_a).await {
        eprintln!("[{}] [FULL PIPELINE] failed to save snapshot A: {}", ts_hm(), e);
        ticket.finish(None).await;
        return Err(EngineError::Transport(e.to_string()));
    }
    if let Err(e) = engine.data_store.save_snapshot(&snapshot_b).await {
        eprintln!("[{}] [FULL PIPELINE] failed to save snapshot B: {}", ts_hm(), e);
        ticket.finish(None).await;
        return Err(EngineError::Transport(e.to_string()));
    }

    let ranked = match_and_filter(&settings, &items_a, &items_b, now);

    if let Err(e) = engine.data_store.save_opportunities(&ranked, &settings, now).await {
        eprintln!("[{}] [FULL PIPELINE] failed to save opportunities: {}", ts_hm(), e);
        ticket.finish(None).await;
        return Err(EngineError::Transport(e.to_string()));
    }
    if let Err(e) = engine.hashname_cache.update_from_full_run(&ranked, settings.incremental_cache_size, now).await {
        eprintln!("[{}] [FULL PIPELINE] failed to rebuild hashname cache: {}", ts_hm(), e);
    }

    println!(
        "[{}] [FULL PIPELINE] completed: {} items A, {} items B, {} opportunities",
        ts_hm(),
        items_a.len(),
        items_b.len(),
        ranked.len()
    );

    ticket.finish(Some(ranked.clone())).await;
    Ok(ranked)
}

/// Builds the matched and filtered opportunity list from two item sets.
/// Shared by the Full-Update Pipeline, the Streaming Pipeline, and
/// Reprocess so the matcher/filter composition lives in exactly one
/// place (§4.4: pre-filter A-items by price/listing-count before
/// probing the lookup; §4.5: the full filter window is re-applied by
/// `filter_and_rank` regardless).
pub fn match_and_filter(settings: &Settings, items_a: &[Item], items_b: &[Item], now: i64) -> Vec<Opportunity> {
    let index = MatchIndex::build(items_b);
    let candidates_a: Vec<&Item> = items_a
        .iter()
        .filter(|item| settings.is_price_a_in_range(item.price) && item.listing_count >= settings.listing_count_min)
        .collect();
    let (matches, counters) = match_items(&candidates_a, &index, items_b);
    println!(
        "[{}] [MATCHER] exact={} normalized={} none={}",
        ts_hm(),
        counters.exact,
        counters.normalized,
        counters.none
    );
    let candidates: Vec<Opportunity> = matches.iter().map(|m| to_opportunity(m, now)).collect();
    filter::filter_and_rank(settings, candidates)
}
