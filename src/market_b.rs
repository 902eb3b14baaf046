//! Marketplace Client for platform B (§4.1).
//!
//! Platform B does not report a total count up front; the crawl walks
//! page indices until a strictly empty page is returned (SPEC_FULL.md §9:
//! a short-but-nonempty page is logged and treated as a normal page, not
//! end-of-catalog, since some listings can be filtered server-side
//! without signalling the end of the walk). Grounded on
//! `original_source/optimized_api_client.py`'s `OptimizedYoupinClient`
//! sibling class and its shared retry semantics; structurally mirrors
//! `market_a.rs`.

use std::time::Duration;

use serde::Deserialize;

use crate::credentials::{CredentialBag, CredentialsStore};
use crate::engine::error::EngineError;
use crate::engine::rate_limiter::RateLimiter;
use crate::engine::types::{Item, Platform};
use crate::utils::{backoff_with_jitter, ts_hm};

const BASE_URL: &str = "https://api.platform-b.example/market";
const MAX_RETRIES: u32 = 5;
const BASE_DELAY: Duration = Duration::from_millis(500);
const MAX_DELAY: Duration = Duration::from_secs(10);

pub struct MarketBClient {
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SaleTemplateResponse {
    data: SaleTemplateData,
}

#[derive(Debug, Deserialize)]
struct SaleTemplateData {
    list: Vec<SaleTemplateRow>,
}

#[derive(Debug, Deserialize)]
struct SaleTemplateRow {
    id: String,
    #[serde(rename = "commodityHashName")]
    commodity_hash_name: String,
    #[serde(rename = "commodityName")]
    commodity_name: String,
    price: String,
    #[serde(rename = "onSaleCount")]
    on_sale_count: u64,
    #[serde(rename = "iconUrl")]
    icon_url: Option<String>,
    #[serde(rename = "typeName")]
    type_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SaleTemplateSearchResponse {
    data: SaleTemplateSearchData,
}

#[derive(Debug, Deserialize)]
struct SaleTemplateSearchData {
    #[serde(rename = "dataList")]
    data_list: Vec<SaleTemplateRow>,
}

/// Builds the listing URL a human would open to verify an opportunity
/// (§4.4's `source_url_b` on `Opportunity`). Not fetched, only formatted.
pub fn detail_url(item: &Item) -> String {
    format!("{}/goods/{}", BASE_URL, item.platform_id)
}

impl MarketBClient {
    pub fn new() -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| EngineError::Transport(e.to_string()))?;
        Ok(Self { http })
    }

    pub async fn connection_check(&self) -> Result<(), EngineError> {
        let url = format!("{}/ping", BASE_URL);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| EngineError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(EngineError::Transport(format!("connection check failed: {}", response.status())));
        }
        println!("[{}] platform B connection check OK", ts_hm());
        Ok(())
    }

    /// Walks page indices starting at 1 until a strictly empty page ends
    /// the catalog or `max_pages` is reached, whichever comes first.
    pub async fn fetch_snapshot(
        &self,
        credentials: &CredentialsStore,
        rate_limiter: &RateLimiter,
        page_size: u32,
        max_pages: u32,
        mut should_stop: impl FnMut() -> bool,
    ) -> Result<Vec<Item>, EngineError> {
        let bag = credentials.get(Platform::B).await;
        let mut items = Vec::new();

        for page_index in 1..=max_pages {
            if should_stop() {
                println!("[{}] platform B crawl cancelled at page {}", ts_hm(), page_index);
                break;
            }

            let rows = self.fetch_page_inner(&bag, rate_limiter, page_index, page_size).await?;
            if rows.is_empty() {
                println!("[{}] platform B reached end of catalog at page {}", ts_hm(), page_index);
                break;
            }
            if (rows.len() as u32) < page_size {
                println!(
                    "[{}] platform B page {} returned {} of {} rows, continuing",
                    ts_hm(),
                    page_index,
                    rows.len(),
                    page_size
                );
            }
            items.extend(sale_rows_to_items(rows));
        }

        Ok(items)
    }

    /// Public single-page fetch for callers that want to drive the crawl
    /// themselves (the Streaming Pipeline's per-page progress events).
    pub async fn fetch_page(
        &self,
        credentials: &CredentialsStore,
        rate_limiter: &RateLimiter,
        page_index: u32,
        page_size: u32,
    ) -> Result<Vec<Item>, EngineError> {
        let bag = credentials.get(Platform::B).await;
        let rows = self.fetch_page_inner(&bag, rate_limiter, page_index, page_size).await?;
        Ok(sale_rows_to_items(rows))
    }

    /// Keyword search (§4.9 Reprocess / manual lookups), grounded on
    /// `original_source/search_api_client.py`'s Youpin `search_by_keyword`:
    /// posts `keyWords` instead of a page sweep and reads `data.dataList`
    /// rather than `data.list`.
    pub async fn search(
        &self,
        credentials: &CredentialsStore,
        rate_limiter: &RateLimiter,
        keyword: &str,
    ) -> Result<Vec<Item>, EngineError> {
        let bag = credentials.get(Platform::B).await;
        rate_limiter.acquire().await;

        let url = format!("{}/goods/querySaleTemplate", BASE_URL);
        let mut request = self.http.post(&url).json(&serde_json::json!({
            "listSortType": 0,
            "sortType": 0,
            "keyWords": keyword,
            "pageSize": 50,
            "pageIndex": 1,
        }));
        for (key, value) in &bag.cookies {
            request = request.header("Cookie", format!("{}={}", key, value));
        }
        for (key, value) in &bag.headers {
            request = request.header(key, value);
        }

        let response = request.send().await.map_err(|e| EngineError::Transport(e.to_string()))?;
        match response.status().as_u16() {
            200 => {
                let body: SaleTemplateSearchResponse = response
                    .json()
                    .await
                    .map_err(|e| EngineError::Malformed(e.to_string()))?;
                Ok(sale_rows_to_items(body.data.data_list))
            }
            401 | 403 => Err(EngineError::AuthFailed(format!("search for {:?} returned auth error", keyword))),
            status => Err(EngineError::Transport(format!("search returned {}", status))),
        }
    }

    async fn fetch_page_inner(
        &self,
        bag: &CredentialBag,
        rate_limiter: &RateLimiter,
        page_index: u32,
        page_size: u32,
    ) -> Result<Vec<SaleTemplateRow>, EngineError> {
        let url = format!("{}/goods/querySaleTemplate", BASE_URL);

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                backoff_with_jitter(attempt, BASE_DELAY, MAX_DELAY).await;
            }
            rate_limiter.acquire().await;

            let mut request = self.http.post(&url).json(&serde_json::json!({
                "pageIndex": page_index,
                "pageSize": page_size,
            }));
            for (key, value) in &bag.cookies {
                request = request.header("Cookie", format!("{}={}", key, value));
            }
            for (key, value) in &bag.headers {
                request = request.header(key, value);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    eprintln!(
                        "[{}] platform B transport error on page {} (attempt {}): {}",
                        ts_hm(),
                        page_index,
                        attempt,
                        e
                    );
                    continue;
                }
            };

            match response.status().as_u16() {
                200 => {
                    let body: SaleTemplateResponse = response
                        .json()
                        .await
                        .map_err(|e| EngineError::Malformed(e.to_string()))?;
                    return Ok(body.data.list);
                }
                401 | 403 => return Err(EngineError::AuthFailed(format!("page {} returned auth error", page_index))),
                429 => {
                    eprintln!("[{}] platform B rate limited on page {}, backing off", ts_hm(), page_index);
                    tokio::time::sleep(MAX_DELAY).await;
                }
                status => {
                    eprintln!("[{}] platform B page {} returned {}", ts_hm(), page_index, status);
                }
            }
        }

        Err(EngineError::RateLimitedPersistent)
    }
}

fn sale_rows_to_items(rows: Vec<SaleTemplateRow>) -> Vec<Item> {
    let now = chrono::Utc::now().timestamp();
    rows.into_iter()
        .filter_map(|row| {
            let price: f64 = row.price.parse().ok()?;
            Some(Item {
                platform: Platform::B,
                platform_id: row.id,
                display_name: row.commodity_name,
                canonical_name: row.commodity_hash_name,
                price,
                listing_count: row.on_sale_count,
                image_url: row.icon_url,
                category: row.type_name,
                captured_at: now,
            })
        })
        .collect()
}
