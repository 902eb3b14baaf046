//! Scheduler (§4.11): the two periodic loops (hourly full, per-minute
//! incremental) plus on-demand force triggers.
//!
//! Grounded on `original_source/update_manager.py`'s
//! `_full_update_loop`/`_incremental_update_loop`
//! (`stop_event.wait(timeout=...)` cooperative termination) translated
//! to the `tokio::select! { _ = interval.tick() => ..., _ = shutdown
//! => break }` shape used throughout the teacher's connector
//! `run_ws_worker` functions.

use tokio::sync::watch;

use crate::engine::{full_pipeline, incremental_pipeline, SharedEngine};
use crate::utils::ts_hm;

pub struct Scheduler {
    engine: SharedEngine,
    shutdown_rx: watch::Receiver<bool>,
}

impl Scheduler {
    pub fn new(engine: SharedEngine, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self { engine, shutdown_rx }
    }

    /// Spawns the full-update and incremental-update loops as independent
    /// background tasks and returns immediately; both observe the same
    /// shutdown signal.
    pub fn start(&self) -> (tokio::task::JoinHandle<()>, tokio::task::JoinHandle<()>) {
        let full_handle = tokio::spawn(run_full_loop(self.engine.clone(), self.shutdown_rx.clone()));
        let incremental_handle = tokio::spawn(run_incremental_loop(self.engine.clone(), self.shutdown_rx.clone()));
        (full_handle, incremental_handle)
    }

    /// Administrative trigger (§4.11 "force triggers" / the `POST
    /// /force-full` route): goes through the normal gate policy via
    /// `full_pipeline::run`, which itself force-starts.
    pub async fn force_full(engine: &SharedEngine) -> Result<Vec<crate::engine::types::Opportunity>, crate::engine::error::EngineError> {
        full_pipeline::run(engine).await
    }

    /// `POST /force-incremental`: force-starts ahead of any competing
    /// non-forced analysis, unlike the scheduler's own tick.
    pub async fn force_incremental(engine: &SharedEngine) -> Result<Vec<crate::engine::types::Opportunity>, crate::engine::error::EngineError> {
        let ticket = match engine.gate.try_start(crate::engine::gate::AnalysisKind::Incremental, true).await {
            Some(t) => t,
            None => return Err(crate::engine::error::EngineError::GateBusy),
        };
        incremental_pipeline::run_with_ticket(engine, &ticket).await
    }
}

async fn run_full_loop(engine: SharedEngine, mut shutdown_rx: watch::Receiver<bool>) {
    let settings = engine.settings.get();

    let due_at_startup = engine.hashname_cache.is_due_for_full_update(settings.full_interval_secs).await;
    if due_at_startup {
        println!("[{}] [SCHEDULER] full update due at startup", ts_hm());
        if let Err(e) = full_pipeline::run(&engine).await {
            eprintln!("[{}] [SCHEDULER] startup full run failed: {}", ts_hm(), e);
        }
    }

    let mut interval = crate::utils::interval_secs(engine.settings.get().full_interval_secs);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                println!("[{}] [SCHEDULER] full tick", ts_hm());
                if let Err(e) = full_pipeline::run(&engine).await {
                    eprintln!("[{}] [SCHEDULER] full run failed: {}", ts_hm(), e);
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    println!("[{}] [SCHEDULER] full loop shutting down", ts_hm());
                    break;
                }
            }
        }
    }
}

async fn run_incremental_loop(engine: SharedEngine, mut shutdown_rx: watch::Receiver<bool>) {
    let mut interval = crate::utils::interval_secs(engine.settings.get().incremental_interval_secs);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match incremental_pipeline::run(&engine).await {
                    Ok(_) => {}
                    Err(e) if matches!(e, crate::engine::error::EngineError::GateBusy) => {
                        println!("[{}] [SCHEDULER] incremental tick skipped, gate busy", ts_hm());
                    }
                    Err(e) => eprintln!("[{}] [SCHEDULER] incremental run failed: {}", ts_hm(), e),
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    println!("[{}] [SCHEDULER] incremental loop shutting down", ts_hm());
                    break;
                }
            }
        }
    }
}
