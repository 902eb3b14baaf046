//! Analysis Gate (§4.7): at most one analysis — full, incremental,
//! streaming, or manual (Reprocess) — may run at a time for the whole
//! process.
//!
//! Grounded on `original_source/analysis_manager.py`'s `AnalysisManager`
//! singleton: `is_running`/`current_analysis_id`/`stop_requested` guarded
//! by one lock, with `start_analysis` either force-stopping the current
//! run or rejecting the new one, and `should_stop()` polled cooperatively
//! by whichever pipeline is running, plus `finish_analysis`'s atomic
//! last-results cache replacement. Translated to the teacher's
//! `Arc<Mutex<_>>`-guarded-state idiom instead of a `threading.Lock`
//! singleton, since there is already exactly one `Engine` per process.
//! `stop_requested` is an `Arc<AtomicBool>` handed directly to the
//! ticket rather than re-checked through the mutex on every poll, so a
//! pipeline's per-page/per-batch cancellation check (§5 suspension
//! points) never contends with `try_start`/`finish`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::engine::types::Opportunity;
use crate::utils::ts_hm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    Full,
    Incremental,
    Streaming,
    Manual,
}

impl AnalysisKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisKind::Full => "full",
            AnalysisKind::Incremental => "incremental",
            AnalysisKind::Streaming => "streaming",
            AnalysisKind::Manual => "manual",
        }
    }
}

struct GateState {
    running: Option<RunInfo>,
}

struct RunInfo {
    id: String,
    kind: AnalysisKind,
    stop_flag: Arc<AtomicBool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GateStatus {
    pub running: bool,
    pub analysis_id: Option<String>,
    pub kind: Option<&'static str>,
}

/// Held by a pipeline for the duration of one run. Dropping it without
/// calling `finish` still releases the gate (a panicking or early-`?`
/// pipeline can never wedge the process into permanent GATE_BUSY); calling
/// `finish` additionally replaces the last-results cache, per spec.md
/// §4.7 `finish(id, results?)`.
pub struct GateTicket {
    gate: AnalysisGate,
    id: String,
    stop_flag: Arc<AtomicBool>,
}

impl GateTicket {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Synchronous, lock-free: safe to call from the non-async closures
    /// the marketplace clients accept as their cancellation predicate
    /// (§4.1 `fetch_all_pages` restartability / §5 suspension points).
    pub fn should_stop(&self) -> bool {
        self.stop_flag.load(Ordering::Relaxed)
    }

    /// Releases the gate slot (if still held by this ticket) and, when
    /// `results` is `Some`, atomically replaces the last-results cache
    /// consumed by the Streaming Pipeline's `cached_data` frame (§4.10).
    pub async fn finish(&self, results: Option<Vec<Opportunity>>) {
        let mut state = self.gate.state.lock().await;
        if matches!(&state.running, Some(run) if run.id == self.id) {
            state.running = None;
        }
        drop(state);
        if let Some(results) = results {
            *self.gate.last_results.write().await = results;
        }
    }
}

impl Drop for GateTicket {
    fn drop(&mut self) {
        let gate = self.gate.clone();
        let id = self.id.clone();
        tokio::spawn(async move {
            let mut state = gate.state.lock().await;
            if matches!(&state.running, Some(run) if run.id == id) {
                state.running = None;
            }
        });
    }
}

#[derive(Clone)]
pub struct AnalysisGate {
    state: Arc<Mutex<GateState>>,
    last_results: Arc<RwLock<Vec<Opportunity>>>,
}

impl AnalysisGate {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(GateState { running: None })),
            last_results: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Attempts to start a new analysis. With `force=false`, returns
    /// `None` (GATE_BUSY) if one is already running. With `force=true`,
    /// immediately installs the new holder regardless, and flips the
    /// displaced holder's `stop_flag` so its `should_stop()` starts
    /// returning true right away rather than waiting for the next mutex
    /// poll.
    pub async fn try_start(&self, kind: AnalysisKind, force: bool) -> Option<GateTicket> {
        let mut state = self.state.lock().await;
        if let Some(current) = &state.running {
            if !force {
                return None;
            }
            current.stop_flag.store(true, Ordering::Relaxed);
        }

        let id = Uuid::new_v4().to_string();
        let stop_flag = Arc::new(AtomicBool::new(false));
        state.running = Some(RunInfo {
            id: id.clone(),
            kind,
            stop_flag: stop_flag.clone(),
        });
        println!("[{}] [GATE] started {} analysis {}", ts_hm(), kind.as_str(), id);
        Some(GateTicket {
            gate: self.clone(),
            id,
            stop_flag,
        })
    }

    /// Signals cancellation to whatever is running without starting a
    /// replacement (§4.7 `force_stop_all`).
    pub async fn force_stop_all(&self) {
        let state = self.state.lock().await;
        if let Some(run) = &state.running {
            run.stop_flag.store(true, Ordering::Relaxed);
        }
    }

    pub async fn status(&self) -> GateStatus {
        let state = self.state.lock().await;
        match &state.running {
            Some(run) => GateStatus {
                running: true,
                analysis_id: Some(run.id.clone()),
                kind: Some(run.kind.as_str()),
            },
            None => GateStatus {
                running: false,
                analysis_id: None,
                kind: None,
            },
        }
    }

    /// The Streaming Pipeline's `cached_data` frame (§4.10) and `GET
    /// /status` both read this without needing to know which pipeline
    /// last wrote it.
    pub async fn cached_results(&self) -> Vec<Opportunity> {
        self.last_results.read().await.clone()
    }
}

impl Default for AnalysisGate {
    fn default() -> Self {
        Self::new()
    }
}
