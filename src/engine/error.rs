//! Typed failure kinds for the engine (§7). Pipelines match on these to
//! decide retry/abort policy; callers outside the engine only ever see
//! `DynError` at the boundary, same as every other fallible path in this
//! crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("auth failed: {0}")]
    AuthFailed(String),

    #[error("rate limited, retries exhausted")]
    RateLimitedPersistent,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("partial snapshot: platform {0} failed")]
    PartialSnapshot(&'static str),

    #[error("gate busy")]
    GateBusy,

    #[error("cancelled")]
    Cancelled,

    #[error("invalid config: {0}")]
    ConfigInvalid(String),
}

impl EngineError {
    /// Transient failures are retried by the marketplace client's own
    /// backoff loop; non-transient ones are surfaced immediately (§4.1).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::RateLimitedPersistent | EngineError::Transport(_) | EngineError::Malformed(_)
        )
    }
}
