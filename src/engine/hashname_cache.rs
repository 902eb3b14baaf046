//! Hash-Name Cache (§4.6): the set of canonical names the last full run
//! found matched and eligible, persisted across restarts and used to
//! scope incremental updates instead of re-crawling everything.
//!
//! Grounded on `original_source/update_manager.py`'s `HashNameCache`
//! (`load_cache`/`save_cache`/`update_from_full_analysis`, truncating by
//! `price_diff` descending when the result set exceeds
//! `INCREMENTAL_CACHE_SIZE`). The original persists via `pickle`; this
//! uses `bincode` instead, the closest analogue in the Rust ecosystem for
//! an opaque single-process binary cache, in the same spirit as the
//! teacher's `strategy/config_storage.rs` persisting serialized config
//! blobs rather than hand-rolled line formats.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::engine::types::Opportunity;
use crate::utils::ts_hm;
use crate::DynError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CacheRecord {
    names: Vec<String>,
    last_full_update: Option<i64>,
}

pub struct HashNameCache {
    path: PathBuf,
    state: RwLock<CacheRecord>,
}

impl HashNameCache {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            state: RwLock::new(CacheRecord::default()),
        }
    }

    /// Loads the on-disk cache, if any, into memory. A missing file is
    /// not an error — it means this is the first run, same as the
    /// original's `FileNotFoundError` branch.
    pub async fn load(&self) -> Result<(), DynError> {
        if !self.path.exists() {
            println!("[{}] [HASHNAME CACHE] no cache file, starting empty", ts_hm());
            return Ok(());
        }
        let body = tokio::fs::read(&self.path).await?;
        let record: CacheRecord = bincode::deserialize(&body)?;
        println!("[{}] [HASHNAME CACHE] loaded {} names", ts_hm(), record.names.len());
        *self.state.write().await = record;
        Ok(())
    }

    async fn persist(&self, record: &CacheRecord) -> Result<(), DynError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = bincode::serialize(record)?;
        let tmp_path = self.path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &body).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    /// Replaces the cache with the names behind `opportunities`, truncated
    /// to `capacity` by descending diff when there are more eligible names
    /// than the cache can hold. Called once per completed full run.
    pub async fn update_from_full_run(
        &self,
        opportunities: &[Opportunity],
        capacity: usize,
        now: i64,
    ) -> Result<(), DynError> {
        let mut sorted: Vec<&Opportunity> = opportunities.iter().collect();
        sorted.sort_by(|a, b| b.diff().partial_cmp(&a.diff()).unwrap_or(std::cmp::Ordering::Equal));
        sorted.truncate(capacity);

        let record = CacheRecord {
            names: sorted.into_iter().map(|o| o.canonical_name.clone()).collect(),
            last_full_update: Some(now),
        };

        self.persist(&record).await?;
        println!("[{}] [HASHNAME CACHE] updated with {} names", ts_hm(), record.names.len());
        *self.state.write().await = record;
        Ok(())
    }

    pub async fn names(&self) -> Vec<String> {
        self.state.read().await.names.clone()
    }

    pub async fn name_set(&self) -> HashSet<String> {
        self.state.read().await.names.iter().cloned().collect()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.names.is_empty()
    }

    /// Drives the scheduler's full-loop due-check (§4.11): due if there
    /// has never been a successful full run, or if `interval_secs` has
    /// elapsed since the last one.
    pub async fn is_due_for_full_update(&self, interval_secs: u64) -> bool {
        match self.state.read().await.last_full_update {
            None => true,
            Some(last) => (chrono::Utc::now().timestamp() - last) >= interval_secs as i64,
        }
    }

    /// Drops the cache without touching the on-disk file's existence —
    /// called when a settings edit narrows or widens eligibility (§9),
    /// forcing the next tick to run a full update instead of trusting a
    /// cache built under the old window.
    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        *state = CacheRecord::default();
        println!("[{}] [HASHNAME CACHE] invalidated by settings change", ts_hm());
    }
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

    #[tokio::test]
    async fn truncates_by_descending_diff_when_over_capacity() {
        let dir = std::env::temp_dir().join(format!("hashname-cache-test-{}", uuid::Uuid::new_v4()));
        let cache = HashNameCache::new(dir.join("cache.bin"));
        let opportunities = vec![opp("small", 1.0), opp("big", 10.0), opp("mid", 5.0)];
        cache.update_from_full_run(&opportunities, 2, 0).await.unwrap();
        let names = cache.names().await;
        assert_eq!(names, vec!["big".to_string(), "mid".to_string()]);
    }

    #[tokio::test]
    async fn due_for_full_update_when_never_run() {
        let dir = std::env::temp_dir().join(format!("hashname-cache-test-{}", uuid::Uuid::new_v4()));
        let cache = HashNameCache::new(dir.join("cache.bin"));
        assert!(cache.is_due_for_full_update(3600).await);
    }

    #[tokio::test]
    async fn not_due_immediately_after_a_full_run() {
        let dir = std::env::temp_dir().join(format!("hashname-cache-test-{}", uuid::Uuid::new_v4()));
        let cache = HashNameCache::new(dir.join("cache.bin"));
        cache.update_from_full_run(&[opp("a", 1.0)], 10, chrono::Utc::now().timestamp()).await.unwrap();
        assert!(!cache.is_due_for_full_update(3600).await);
    }

    #[tokio::test]
    async fn invalidate_clears_in_memory_state() {
        let dir = std::env::temp_dir().join(format!("hashname-cache-test-{}", uuid::Uuid::new_v4()));
        let cache = HashNameCache::new(dir.join("cache.bin"));
        cache.update_from_full_run(&[opp("a", 1.0)], 10, 0).await.unwrap();
        assert!(!cache.is_empty().await);
        cache.invalidate().await;
        assert!(cache.is_empty().await);
    }
}
