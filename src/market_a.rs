//! Marketplace Client for platform A (§4.1).
//!
//! Platform A reports a total-page-count on its first response, so the
//! crawl fetches page 1, learns `total_pages`, then walks the rest up to
//! `max_pages`. Grounded on `original_source/optimized_api_client.py`'s
//! `OptimizedBuffClient.get_all_goods_safe` for that two-phase shape and
//! its `request_with_retry` status-code handling (200 decodes, 429 waits
//! the full max delay and retries, 401/403 are a hard auth failure, anything
//! else retries with backoff up to `max_retries`); and on the teacher's
//! `binance.rs` connector shape (`BASE_URL` const, `connection_check`,
//! a unit struct as the namespace for its methods).

use std::time::Duration;

use serde::Deserialize;

use crate::credentials::{CredentialBag, CredentialsStore};
use crate::engine::error::EngineError;
use crate::engine::rate_limiter::RateLimiter;
use crate::engine::types::{Item, Platform};
use crate::utils::{backoff_with_jitter, ts_hm};

const BASE_URL: &str = "https://api.platform-a.example/market";
const MAX_RETRIES: u32 = 5;
const BASE_DELAY: Duration = Duration::from_millis(500);
const MAX_DELAY: Duration = Duration::from_secs(10);

pub struct MarketAClient {
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GoodsListResponse {
    data: GoodsListData,
}

#[derive(Debug, Deserialize)]
struct GoodsListData {
    total_page: u32,
    items: Vec<GoodsRow>,
}

#[derive(Debug, Deserialize)]
struct GoodsRow {
    id: String,
    #[serde(rename = "market_hash_name")]
    market_hash_name: String,
    name: String,
    sell_min_price: String,
    sell_num: u64,
    icon_url: Option<String>,
    goods_info: Option<GoodsInfo>,
}

#[derive(Debug, Deserialize)]
struct GoodsInfo {
    category_name: Option<String>,
}

/// One page of platform-A results plus the total page count it reported,
/// the shape the Streaming Pipeline needs when it drives the crawl one
/// page at a time instead of through `fetch_snapshot`'s all-at-once loop.
pub struct Page {
    pub items: Vec<Item>,
    pub total_pages: u32,
}

/// Builds the listing URL a human would open to verify an opportunity
/// (§4.4's `source_url_a` on `Opportunity`). Not fetched, only formatted.
pub fn detail_url(item: &Item) -> String {
    format!("{}/goods/{}", BASE_URL, item.platform_id)
}

impl MarketAClient {
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
        println!("[{}] platform A connection check OK", ts_hm());
        Ok(())
    }

    /// Crawls up to `max_pages` pages (fewer if `total_page` reported by
    /// the first page is smaller), stopping early and returning whatever
    /// was gathered so far if `should_stop` flips mid-crawl (§4.7
    /// cancellation boundary).
    pub async fn fetch_snapshot(
        &self,
        credentials: &CredentialsStore,
        rate_limiter: &RateLimiter,
        page_size: u32,
        max_pages: u32,
        mut should_stop: impl FnMut() -> bool,
    ) -> Result<Vec<Item>, EngineError> {
        let bag = credentials.get(Platform::A).await;

        let first_page = self.fetch_page_inner(&bag, rate_limiter, 1, page_size).await?;
        let total_pages = first_page.total_page.max(1).min(max_pages);
        let mut items = goods_rows_to_items(first_page.items);

        for page_num in 2..=total_pages {
            if should_stop() {
                println!("[{}] platform A crawl cancelled at page {}/{}", ts_hm(), page_num - 1, total_pages);
                break;
            }
            match self.fetch_page_inner(&bag, rate_limiter, page_num, page_size).await {
                Ok(page) => items.extend(goods_rows_to_items(page.items)),
                Err(e) if e.is_transient() => {
                    eprintln!("[{}] platform A page {} failed, skipping: {}", ts_hm(), page_num, e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(items)
    }

    /// Public single-page fetch for callers that want to drive the crawl
    /// themselves (the Streaming Pipeline's per-page progress events).
    pub async fn fetch_page(
        &self,
        credentials: &CredentialsStore,
        rate_limiter: &RateLimiter,
        page_num: u32,
        page_size: u32,
    ) -> Result<Page, EngineError> {
        let bag = credentials.get(Platform::A).await;
        let data = self.fetch_page_inner(&bag, rate_limiter, page_num, page_size).await?;
        let total_pages = data.total_page.max(1);
        Ok(Page {
            items: goods_rows_to_items(data.items),
            total_pages,
        })
    }

    /// Keyword search (§4.9 Reprocess / manual lookups), grounded on
    /// `original_source/search_api_client.py`'s Buff `search_by_keyword`:
    /// same `goods/list` listing endpoint with a `search` query param
    /// instead of a page sweep, capped at one page of results.
    pub async fn search(
        &self,
        credentials: &CredentialsStore,
        rate_limiter: &RateLimiter,
        keyword: &str,
    ) -> Result<Vec<Item>, EngineError> {
        let bag = credentials.get(Platform::A).await;
        rate_limiter.acquire().await;

        let url = format!("{}/goods/list", BASE_URL);
        let mut request = self.http.get(&url).query(&[
            ("page_num", "1".to_string()),
            ("page_size", "50".to_string()),
            ("search", keyword.to_string()),
        ]);
        for (key, value) in &bag.headers {
            request = request.header(key, value);
        }

        let response = request.send().await.map_err(|e| EngineError::Transport(e.to_string()))?;
        match response.status().as_u16() {
            200 => {
                let body: GoodsListResponse = response
                    .json()
                    .await
                    .map_err(|e| EngineError::Malformed(e.to_string()))?;
                Ok(goods_rows_to_items(body.data.items))
            }
            401 | 403 => Err(EngineError::AuthFailed(format!("search for {:?} returned auth error", keyword))),
            status => Err(EngineError::Transport(format!("search returned {}", status))),
        }
    }

    async fn fetch_page_inner(
        &self,
        bag: &CredentialBag,
        rate_limiter: &RateLimiter,
        page_num: u32,
        page_size: u32,
    ) -> Result<GoodsListData, EngineError> {
        let url = format!("{}/goods/list", BASE_URL);

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                backoff_with_jitter(attempt, BASE_DELAY, MAX_DELAY).await;
            }
            rate_limiter.acquire().await;

            let mut request = self
                .http
                .get(&url)
                .query(&[("page_num", page_num.to_string()), ("page_size", page_size.to_string())]);
            for (key, value) in &bag.headers {
                request = request.header(key, value);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("[{}] platform A transport error on page {} (attempt {}): {}", ts_hm(), page_num, attempt, e);
                    continue;
                }
            };

            match response.status().as_u16() {
                200 => {
                    let body: GoodsListResponse = response
                        .json()
                        .await
                        .map_err(|e| EngineError::Malformed(e.to_string()))?;
                    return Ok(body.data);
                }
                401 | 403 => return Err(EngineError::AuthFailed(format!("page {} returned auth error", page_num))),
                429 => {
                    eprintln!("[{}] platform A rate limited on page {}, backing off", ts_hm(), page_num);
                    tokio::time::sleep(MAX_DELAY).await;
                }
                status => {
                    eprintln!("[{}] platform A page {} returned {}", ts_hm(), page_num, status);
                }
            }
        }

        Err(EngineError::RateLimitedPersistent)
    }
}

fn goods_rows_to_items(rows: Vec<GoodsRow>) -> Vec<Item> {
    let now = chrono::Utc::now().timestamp();
    rows.into_iter()
        .filter_map(|row| {
            let price: f64 = row.sell_min_price.parse().ok()?;
            Some(Item {
                platform: Platform::A,
                platform_id: row.id,
                display_name: row.name,
                canonical_name: row.market_hash_name,
                price,
                listing_count: row.sell_num,
                image_url: row.icon_url,
                category: row.goods_info.and_then(|i| i.category_name),
                captured_at: now,
            })
        })
        .collect()
}
