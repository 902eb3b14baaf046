//! Streaming Pipeline (§4.10): a single-consumer SSE-backed analysis run
//! that emits incremental progress instead of making the caller wait
//! for a full crawl to finish.
//!
//! Grounded on `original_source/streaming_analyzer.py`'s
//! `start_streaming_analysis` async generator (`cached_data` →
//! `progress`/`mapping_ready`/`data_batch` → `incremental_results` →
//! terminal `completed`/`cancelled`/`error`), translated to a
//! `tokio::sync::mpsc::Sender<StreamEvent>` producer task the HTTP layer
//! drains into SSE frames (`http/sse.rs`). `data_batch` is internal
//! plumbing in the original (not user-visible in most implementations,
//! per spec.md §4.10) and is not exposed as a distinct envelope here —
//! its purpose is covered by the per-page `IncrementalResults` events.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::engine::gate::AnalysisKind;
use crate::engine::matcher::{match_items, to_opportunity, MatchIndex};
use crate::engine::types::Opportunity;
use crate::engine::{error::EngineError, full_pipeline, SharedEngine};
use crate::utils::ts_hm;

const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    CachedData { opportunities: Vec<Opportunity> },
    Progress { stage: String, percent: Option<f64> },
    MappingReady { index_size_b: usize },
    IncrementalResults { opportunities: Vec<Opportunity> },
    Completed { total_count: usize, opportunities: Vec<Opportunity>, generated_at: i64 },
    Cancelled,
    Error { message: String },
}

pub struct StreamHandle {
    pub receiver: mpsc::Receiver<StreamEvent>,
}

/// Starts a streaming analysis. Rejects a second concurrent subscriber
/// the same way any other non-forced analysis is rejected by the gate
/// (§4.7; the HTTP layer maps `GateBusy` to 409).
pub async fn start(engine: SharedEngine) -> Result<StreamHandle, EngineError> {
    let ticket = match engine.gate.try_start(AnalysisKind::Streaming, false).await {
        Some(t) => t,
        None => return Err(EngineError::GateBusy),
    };

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let cached = engine.gate.cached_results().await;
        if tx.send(StreamEvent::CachedData { opportunities: cached }).await.is_err() {
            ticket.finish(None).await;
            return;
        }

        if ticket.should_stop() {
            let _ = tx.send(StreamEvent::Cancelled).await;
            ticket.finish(None).await;
            return;
        }

        let settings = engine.settings.get();
        let _ = tx
            .send(StreamEvent::Progress { stage: "fetching_b".into(), percent: None })
            .await;

        let ticket_ref = &ticket;
        let items_b = match engine
            .market_b
            .fetch_snapshot(&engine.credentials, &engine.rate_limiter_b, settings.page_size_b, settings.max_pages_b, move || ticket_ref.should_stop())
            .await
        {
            Ok(items) => items,
            Err(e) => {
                let _ = tx.send(StreamEvent::Error { message: e.to_string() }).await;
                ticket.finish(None).await;
                return;
            }
        };

        if ticket.should_stop() {
            let _ = tx.send(StreamEvent::Cancelled).await;
            ticket.finish(None).await;
            return;
        }

        let index = MatchIndex::build(&items_b);
        let _ = tx.send(StreamEvent::MappingReady { index_size_b: items_b.len() }).await;

        let _ = tx
            .send(StreamEvent::Progress { stage: "analyzing".into(), percent: Some(0.0) })
            .await;

        let mut all_items_a = Vec::new();
        let mut page_num = 1u32;
        let mut total_pages = u32::MAX;
        let now = chrono::Utc::now().timestamp();

        while page_num <= total_pages.min(settings.max_pages_a) {
            if ticket.should_stop() {
                let _ = tx.send(StreamEvent::Cancelled).await;
                ticket.finish(None).await;
                return;
            }

            let page = match engine
                .market_a
                .fetch_page(&engine.credentials, &engine.rate_limiter_a, page_num, settings.page_size_a)
                .await
            {
                Ok(page) => page,
                Err(e) if e.is_transient() => {
                    eprintln!("[{}] [STREAMING PIPELINE] page {} failed, skipping: {}", ts_hm(), page_num, e);
                    page_num += 1;
                    continue;
                }
                Err(e) => {
                    let _ = tx.send(StreamEvent::Error { message: e.to_string() }).await;
                    ticket.finish(None).await;
                    return;
                }
            };

            total_pages = page.total_pages;
            let candidates_a: Vec<&crate::engine::types::Item> = page
                .items
                .iter()
                .filter(|item| settings.is_price_a_in_range(item.price) && item.listing_count >= settings.listing_count_min)
                .collect();
            let (matches, _counters) = match_items(&candidates_a, &index, &items_b);
            let page_opportunities: Vec<Opportunity> = matches.iter().map(|m| to_opportunity(m, now)).collect();
            let page_opportunities = crate::engine::filter::filter_and_rank(&settings, page_opportunities);

            if !page_opportunities.is_empty() {
                let _ = tx
                    .send(StreamEvent::IncrementalResults { opportunities: page_opportunities })
                    .await;
            }

            let _ = tx
                .send(StreamEvent::Progress {
                    stage: "analyzing".into(),
                    percent: Some((page_num as f64 / total_pages.max(1) as f64) * 100.0),
                })
                .await;

            all_items_a.extend(page.items);
            page_num += 1;
        }

        let ranked = full_pipeline::match_and_filter(&settings, &all_items_a, &items_b, now);

        let snapshot_a = crate::engine::types::Snapshot::new(
            crate::engine::types::Platform::A,
            settings.page_size_a,
            settings.max_pages_a,
            all_items_a,
            now,
        );
        let snapshot_b = crate::engine::types::Snapshot::new(
            crate::engine::types::Platform::B,
            settings.page_size_b,
            settings.max_pages_b,
            items_b,
            now,
        );
        let _ = engine.data_store.save_snapshot(&snapshot_a).await;
        let _ = engine.data_store.save_snapshot(&snapshot_b).await;
        let _ = engine.data_store.save_opportunities(&ranked, &settings, now).await;
        if let Err(e) = engine.hashname_cache.update_from_full_run(&ranked, settings.incremental_cache_size, now).await {
            eprintln!("[{}] [STREAMING PIPELINE] failed to rebuild hashname cache: {}", ts_hm(), e);
        }

        let _ = tx
            .send(StreamEvent::Completed {
                total_count: ranked.len(),
                opportunities: ranked.clone(),
                generated_at: now,
            })
            .await;

        ticket.finish(Some(ranked)).await;
    });

    Ok(StreamHandle { receiver: rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_event_serializes_with_type_tag() {
        let event = StreamEvent::Cancelled;
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"cancelled"}"#);
    }

    #[test]
    fn cached_data_event_carries_opportunities() {
        let event = StreamEvent::CachedData { opportunities: vec![] };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.starts_with(r#"{"type":"cached_data""#));
    }
}
