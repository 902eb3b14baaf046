//! Process-wide mutable configuration (§3 Settings, §4.12).
//!
//! Grounded on `original_source/config.py`'s `Config` dataclass (env-var
//! defaults, `is_price_diff_in_range`/`is_buff_price_in_range` classmethods)
//! and on `strategy/config_storage.rs`'s `ConfigValidator` (reject invalid
//! mutations, keep the prior value). Here there is exactly one mutable
//! record rather than a key-value store, so it is a plain struct behind one
//! `RwLock` rather than a trait-object storage backend.

use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::Duration;

use crate::engine::error::EngineError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub diff_min: f64,
    pub diff_max: f64,
    pub price_min_a: f64,
    pub price_max_a: f64,
    pub listing_count_min: u64,
    pub max_output_items: usize,
    pub full_interval_secs: u64,
    pub incremental_interval_secs: u64,
    pub incremental_cache_size: usize,
    pub request_delay_ms_a: u64,
    pub request_delay_ms_b: u64,
    pub page_size_a: u32,
    pub page_size_b: u32,
    pub max_pages_a: u32,
    pub max_pages_b: u32,
}

impl Default for Settings {
    fn default() -> Self {
        fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
            std::env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
        }

        Self {
            diff_min: env_or("PRICE_DIFF_MIN", 3.0),
            diff_max: env_or("PRICE_DIFF_MAX", 5.0),
            price_min_a: env_or("BUFF_PRICE_MIN", 10.0),
            price_max_a: env_or("BUFF_PRICE_MAX", 1000.0),
            listing_count_min: env_or("LISTING_COUNT_MIN", 1),
            max_output_items: env_or("MAX_OUTPUT_ITEMS", 300),
            full_interval_secs: env_or("FULL_UPDATE_INTERVAL_SECS", 3600),
            incremental_interval_secs: env_or("INCREMENTAL_UPDATE_INTERVAL_SECS", 60),
            incremental_cache_size: env_or("INCREMENTAL_CACHE_SIZE", 1000),
            request_delay_ms_a: env_or("REQUEST_DELAY_MS_A", 2000),
            request_delay_ms_b: env_or("REQUEST_DELAY_MS_B", 2000),
            page_size_a: env_or("PAGE_SIZE_A", 80),
            page_size_b: env_or("PAGE_SIZE_B", 100),
            max_pages_a: env_or("MAX_PAGES_A", 2000),
            max_pages_b: env_or("MAX_PAGES_B", 2000),
        }
    }
}

impl Settings {
    pub fn full_interval(&self) -> Duration {
        Duration::from_secs(self.full_interval_secs)
    }

    pub fn incremental_interval(&self) -> Duration {
        Duration::from_secs(self.incremental_interval_secs)
    }

    pub fn is_diff_in_range(&self, diff: f64) -> bool {
        diff >= self.diff_min && diff <= self.diff_max
    }

    pub fn is_price_a_in_range(&self, price_a: f64) -> bool {
        price_a >= self.price_min_a && price_a <= self.price_max_a
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.diff_min >= self.diff_max {
            return Err(EngineError::ConfigInvalid(format!(
                "diff_min ({}) must be < diff_max ({})",
                self.diff_min, self.diff_max
            )));
        }
        if self.price_min_a < 0.0 || self.price_max_a < 0.0 {
            return Err(EngineError::ConfigInvalid("prices must be non-negative".into()));
        }
        if self.price_min_a >= self.price_max_a {
            return Err(EngineError::ConfigInvalid(format!(
                "price_min_a ({}) must be < price_max_a ({})",
                self.price_min_a, self.price_max_a
            )));
        }
        if self.max_output_items == 0 {
            return Err(EngineError::ConfigInvalid("max_output_items must be > 0".into()));
        }
        Ok(())
    }
}

/// A partial update: any field left `None` leaves the current value
/// untouched. Mirrors the PATCH-style body `POST /settings` accepts (§6).
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SettingsPatch {
    pub diff_min: Option<f64>,
    pub diff_max: Option<f64>,
    pub price_min_a: Option<f64>,
    pub price_max_a: Option<f64>,
    pub listing_count_min: Option<u64>,
    pub max_output_items: Option<usize>,
}

/// Whether a settings mutation changed the *eligibility* window
/// (listing_count_min, price_min_a, price_max_a) as opposed to only the
/// diff window or the output cap. Drives the Hash-Name Cache invalidation
/// decision in SPEC_FULL.md §9.
pub struct ApplyOutcome {
    pub eligibility_changed: bool,
}

pub struct SettingsStore {
    inner: RwLock<Settings>,
}

impl SettingsStore {
    pub fn new(initial: Settings) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    pub fn get(&self) -> Settings {
        self.inner.read().expect("settings lock poisoned").clone()
    }

    /// Atomic read-modify-write: reject the whole patch (prior settings
    /// untouched) if the resulting record fails validation (§7
    /// CONFIG_INVALID).
    pub fn apply_patch(&self, patch: SettingsPatch) -> Result<ApplyOutcome, EngineError> {
        let mut guard = self.inner.write().expect("settings lock poisoned");
        let mut next = guard.clone();

        if let Some(v) = patch.diff_min {
            next.diff_min = v;
        }
        if let Some(v) = patch.diff_max {
            next.diff_max = v;
        }
        if let Some(v) = patch.price_min_a {
            next.price_min_a = v;
        }
        if let Some(v) = patch.price_max_a {
            next.price_max_a = v;
        }
        if let Some(v) = patch.listing_count_min {
            next.listing_count_min = v;
        }
        if let Some(v) = patch.max_output_items {
            next.max_output_items = v;
        }

        next.validate()?;

        let eligibility_changed = next.listing_count_min != guard.listing_count_min
            || next.price_min_a != guard.price_min_a
            || next.price_max_a != guard.price_max_a;

        *guard = next;
        Ok(ApplyOutcome { eligibility_changed })
    }
}
