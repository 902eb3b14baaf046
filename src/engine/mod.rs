//! The engine: all stateful components wired together behind one
//! `Engine` owner, constructed once in `main.rs` and shared as `Arc<Engine>`.
//! Mirrors the teacher's top-level `strategy` module boundary, which owns
//! the rate limiter, config storage, and scanner behind a single
//! `Strategy` struct handed around as `Arc<Strategy>`.

pub mod data_store;
pub mod error;
pub mod filter;
pub mod full_pipeline;
pub mod gate;
pub mod hashname_cache;
pub mod incremental_pipeline;
pub mod matcher;
pub mod rate_limiter;
pub mod reprocess;
pub mod scheduler;
pub mod settings;
pub mod streaming_pipeline;
pub mod types;

use std::sync::Arc;

use crate::credentials::CredentialsStore;
use crate::market_a::MarketAClient;
use crate::market_b::MarketBClient;

use data_store::DataStore;
use gate::AnalysisGate;
use hashname_cache::HashNameCache;
use rate_limiter::RateLimiter;
use settings::{Settings, SettingsStore};

/// Owns every singleton the pipelines and HTTP surface need. Subsystems
/// borrow it as `Arc<Engine>` rather than each keeping their own handles,
/// so there is exactly one of each component for the life of the process.
pub struct Engine {
    pub settings: SettingsStore,
    pub data_store: DataStore,
    pub hashname_cache: HashNameCache,
    pub gate: AnalysisGate,
    pub credentials: CredentialsStore,
    pub rate_limiter_a: RateLimiter,
    pub rate_limiter_b: RateLimiter,
    pub market_a: MarketAClient,
    pub market_b: MarketBClient,
}

impl Engine {
    pub fn new(data_dir: std::path::PathBuf, market_a: MarketAClient, market_b: MarketBClient) -> Self {
        let settings = Settings::default();
        let rate_limiter_a = RateLimiter::new(settings.request_delay_ms_a);
        let rate_limiter_b = RateLimiter::new(settings.request_delay_ms_b);
        Self {
            data_store: DataStore::new(data_dir.clone()),
            hashname_cache: HashNameCache::new(data_dir.join("hashname_cache.bin")),
            gate: AnalysisGate::new(),
            credentials: CredentialsStore::new(),
            settings: SettingsStore::new(settings),
            rate_limiter_a,
            rate_limiter_b,
            market_a,
            market_b,
        }
    }
}

pub type SharedEngine = Arc<Engine>;
