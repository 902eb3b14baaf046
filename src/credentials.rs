//! Token/Credentials Store (§4.2).
//!
//! Grounded on `original_source/token_manager.py`'s `TokenManager`: a
//! per-platform header/cookie bag, plus a cached validation result with a
//! TTL so the marketplace isn't hammered with a cheap probe request on
//! every caller. The original is a process-wide singleton guarded by a
//! `threading.Lock`-style double-checked init; here the single `Engine`
//! instance already gives us that, so this is a plain struct behind an
//! `RwLock` (many readers build request headers, one writer rotates
//! credentials), in the teacher's `Arc<Mutex<_>>`-guarded-state idiom.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::engine::types::Platform;

#[derive(Debug, Clone, Default)]
pub struct CredentialBag {
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    TransientFailure,
    Invalid,
}

#[derive(Clone)]
struct CachedValidation {
    outcome: ValidationOutcome,
    checked_at: Instant,
}

const VALIDATION_TTL: Duration = Duration::from_secs(300);

pub struct CredentialsStore {
    bags: RwLock<HashMap<Platform, CredentialBag>>,
    validations: RwLock<HashMap<Platform, CachedValidation>>,
}

impl CredentialsStore {
    pub fn new() -> Self {
        Self {
            bags: RwLock::new(HashMap::new()),
            validations: RwLock::new(HashMap::new()),
        }
    }

    pub async fn set(&self, platform: Platform, bag: CredentialBag) {
        self.bags.write().await.insert(platform, bag);
        self.validations.write().await.remove(&platform);
    }

    pub async fn get(&self, platform: Platform) -> CredentialBag {
        self.bags.read().await.get(&platform).cloned().unwrap_or_default()
    }

    /// Returns a cached validation outcome if one is fresh enough, unless
    /// `force` is set. `probe` is only invoked on a cache miss; its result
    /// is cached unless it is a transient failure, which the spec forbids
    /// caching as "invalid" (a flaky 5xx shouldn't poison validity for the
    /// TTL window).
    pub async fn validate<F, Fut>(&self, platform: Platform, force: bool, probe: F) -> ValidationOutcome
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = ValidationOutcome>,
    {
        if !force {
            if let Some(cached) = self.validations.read().await.get(&platform) {
                if cached.checked_at.elapsed() < VALIDATION_TTL {
                    return cached.outcome;
                }
            }
        }

        let outcome = probe().await;

        if !matches!(outcome, ValidationOutcome::TransientFailure) {
            self.validations.write().await.insert(
                platform,
                CachedValidation {
                    outcome,
                    checked_at: Instant::now(),
                },
            );
        }

        outcome
    }
}

impl Default for CredentialsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn caches_valid_outcome_until_ttl_or_force() {
        let store = CredentialsStore::new();
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));

        let calls_clone = calls.clone();
        let outcome = store
            .validate(Platform::A, false, || async move {
                calls_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                ValidationOutcome::Valid
            })
            .await;
        assert_eq!(outcome, ValidationOutcome::Valid);

        let calls_clone = calls.clone();
        store
            .validate(Platform::A, false, || async move {
                calls_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                ValidationOutcome::Invalid
            })
            .await;
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_not_cached() {
        let store = CredentialsStore::new();
        let outcome = store
            .validate(Platform::B, false, || async { ValidationOutcome::TransientFailure })
            .await;
        assert_eq!(outcome, ValidationOutcome::TransientFailure);

        let outcome = store
            .validate(Platform::B, false, || async { ValidationOutcome::Valid })
            .await;
        assert_eq!(outcome, ValidationOutcome::Valid);
    }

    #[tokio::test]
    async fn force_bypasses_cache() {
        let store = CredentialsStore::new();
        store
            .validate(Platform::A, false, || async { ValidationOutcome::Valid })
            .await;
        let outcome = store
            .validate(Platform::A, true, || async { ValidationOutcome::Invalid })
            .await;
        assert_eq!(outcome, ValidationOutcome::Invalid);
    }
}
