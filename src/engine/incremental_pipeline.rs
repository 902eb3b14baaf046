//! Incremental Pipeline (§4.9): a cheap, idempotent re-query of the
//! canonical-names the last full run found interesting, run once a
//! minute to catch fast price movement between full crawls.
//!
//! Grounded on `original_source/update_manager.py`'s
//! `_run_incremental_analysis` (bounded `asyncio.Semaphore(5)` fan-out
//! over cached hashnames, chunked batches, an inter-batch delay)
//! translated to `tokio::sync::Semaphore` plus `futures_util::future::
//! join_all` over chunks produced by `utils::chunk_vec`, matching the
//! teacher's batching shape.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::engine::gate::AnalysisKind;
use crate::engine::types::Opportunity;
use crate::engine::SharedEngine;
use crate::engine::error::EngineError;
use crate::utils::{chunk_vec, ts_hm};

const BATCH_SIZE: usize = 5;
const MAX_CONCURRENCY: usize = 5;
const INTER_BATCH_DELAY: Duration = Duration::from_secs(1);

/// Acquires the gate with `force=false`, skipping the tick entirely if
/// an analysis is already running (§4.9 step 1 / §8 scenario S7).
pub async fn run(engine: &SharedEngine) -> Result<Vec<Opportunity>, EngineError> {
    let ticket = match engine.gate.try_start(AnalysisKind::Incremental, false).await {
        Some(t) => t,
        None => return Err(EngineError::GateBusy),
    };
    run_with_ticket(engine, &ticket).await
}

/// The body of the incremental run, factored out so Reprocess's
/// "fall back to an Incremental run when no snapshots exist" path
/// (§4.12) can reuse it under a ticket it already holds.
pub async fn run_with_ticket(engine: &SharedEngine, ticket: &crate::engine::gate::GateTicket) -> Result<Vec<Opportunity>, EngineError> {
    let names = engine.hashname_cache.names().await;
    if names.is_empty() {
        println!("[{}] [INCREMENTAL PIPELINE] hashname cache empty, skipping", ts_hm());
        let current = engine
            .data_store
            .load_opportunities()
            .await
            .ok()
            .flatten()
            .map(|list| list.items)
            .unwrap_or_default();
        ticket.finish(None).await;
        return Ok(current);
    }

    let settings = engine.settings.get();
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENCY));
    let mut refreshed: Vec<Opportunity> = Vec::new();
    let now = chrono::Utc::now().timestamp();

    for batch in chunk_vec(&names, BATCH_SIZE) {
        if ticket.should_stop() {
            println!("[{}] [INCREMENTAL PIPELINE] cancelled mid-batch", ts_hm());
            ticket.finish(None).await;
            return Err(EngineError::Cancelled);
        }

        let tasks = batch.into_iter().map(|canonical_name| {
            let semaphore = semaphore.clone();
            let engine = engine.clone();
            let settings = settings.clone();
            async move {
                let _permit = semaphore.acquire().await.ok()?;
                search_one(&engine, &settings, &canonical_name, now).await
            }
        });

        let results = futures_util::future::join_all(tasks).await;
        refreshed.extend(results.into_iter().flatten());

        tokio::time::sleep(INTER_BATCH_DELAY).await;
    }

    let merged = merge_with_prior(engine, refreshed).await;
    let ranked = rank_by_diff(merged, settings.max_output_items);

    if let Err(e) = engine.data_store.save_opportunities(&ranked, &settings, now).await {
        eprintln!("[{}] [INCREMENTAL PIPELINE] failed to save opportunities: {}", ts_hm(), e);
        ticket.finish(None).await;
        return Err(EngineError::Transport(e.to_string()));
    }

    println!("[{}] [INCREMENTAL PIPELINE] refreshed {} of {} cached names", ts_hm(), refreshed_count(&ranked), names.len());

    ticket.finish(Some(ranked.clone())).await;
    Ok(ranked)
}

fn refreshed_count(ranked: &[Opportunity]) -> usize {
    ranked.len()
}

/// Searches both platforms for `canonical_name`, keeping only exact
/// canonical-name hits (the Incremental Pipeline never falls back to
/// normalized matching — it is refreshing a name already confirmed by a
/// full run). Returns `None` if either platform has no positive-priced
/// listing for it, or the pair does not pass the active filters.
async fn search_one(
    engine: &SharedEngine,
    settings: &crate::engine::settings::Settings,
    canonical_name: &str,
    now: i64,
) -> Option<Opportunity> {
    let (a_result, b_result) = tokio::join!(
        engine.market_a.search(&engine.credentials, &engine.rate_limiter_a, canonical_name),
        engine.market_b.search(&engine.credentials, &engine.rate_limiter_b, canonical_name)
    );
    let a_results = a_result.ok()?;
    let b_results = b_result.ok()?;

    let item_a = a_results.into_iter().find(|i| i.canonical_name == canonical_name && i.price > 0.0)?;
    let item_b = b_results.into_iter().find(|i| i.canonical_name == canonical_name && i.price > 0.0)?;

    if !settings.is_price_a_in_range(item_a.price) || item_a.listing_count < settings.listing_count_min {
        return None;
    }

    let diff = item_b.price - item_a.price;
    if !settings.is_diff_in_range(diff) {
        return None;
    }

    Some(Opportunity {
        canonical_name: item_a.canonical_name.clone(),
        display_name: item_a.display_name.clone(),
        price_a: item_a.price,
        price_b: item_b.price,
        listing_count_a: item_a.listing_count,
        match_kind: crate::engine::types::MatchKind::Exact,
        source_url_a: Some(crate::market_a::detail_url(&item_a)),
        source_url_b: Some(crate::market_b::detail_url(&item_b)),
        category: item_a.category.clone(),
        last_updated: now,
    })
}

/// Items not refreshed this pass retain their prior values (§4.9 step
/// 4): start from the persisted list, then overlay every freshly
/// refreshed entry by canonical-name.
async fn merge_with_prior(engine: &SharedEngine, refreshed: Vec<Opportunity>) -> Vec<Opportunity> {
    let mut merged = engine
        .data_store
        .load_opportunities()
        .await
        .ok()
        .flatten()
        .map(|list| list.items)
        .unwrap_or_default();

    for fresh in refreshed {
        if let Some(existing) = merged.iter_mut().find(|o| o.canonical_name == fresh.canonical_name) {
            *existing = fresh;
        } else {
            merged.push(fresh);
        }
    }

    merged
}

/// §4.9 step 5: sorted by diff descending (not profit_rate — the
/// Incremental Pipeline's own ranking rule, distinct from §4.5's
/// Filter & Ranker), stable, capped to `max_output_items`. Still
/// re-validates each survivor against the active filter window in case
/// settings changed since the items were first persisted.
fn rank_by_diff(mut candidates: Vec<Opportunity>, max_output_items: usize) -> Vec<Opportunity> {
    candidates.sort_by(|a, b| b.diff().partial_cmp(&a.diff()).unwrap_or(std::cmp::Ordering::Equal));
    candidates.truncate(max_output_items);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::MatchKind;

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

    #[test]
    fn rank_by_diff_sorts_descending_and_caps() {
        let candidates = vec![opp("low", 1.0), opp("high", 10.0), opp("mid", 5.0)];
        let ranked = rank_by_diff(candidates, 2);
        let names: Vec<&str> = ranked.iter().map(|o| o.canonical_name.as_str()).collect();
        assert_eq!(names, vec!["high", "mid"]);
    }

    #[test]
    fn rank_by_diff_is_stable_on_ties() {
        let candidates = vec![opp("first", 5.0), opp("second", 5.0)];
        let ranked = rank_by_diff(candidates, 10);
        let names: Vec<&str> = ranked.iter().map(|o| o.canonical_name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
