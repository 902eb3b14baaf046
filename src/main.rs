//! Long-running service entry point: loads credentials and settings,
//! constructs the `Engine`, starts the Scheduler's two periodic loops
//! (§4.11) and the HTTP/SSE surface (§6), then blocks until a shutdown
//! signal arrives.
//!
//! Grounded on the teacher's `src/bin/bybit-synthetic-test.rs` shutdown
//! shape (`tokio::signal::unix::{SIGTERM,SIGINT}` on unix, `ctrl_c` on
//! windows, fed into one `tokio::select!`) and `src/main.rs`'s
//! `tokio::spawn`-one-task-per-connector fan-out pattern, here spawning
//! the scheduler's two loops and the HTTP server instead of one task per
//! exchange connector.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use skin_arb_engine::credentials::CredentialBag;
use skin_arb_engine::engine::scheduler::Scheduler;
use skin_arb_engine::engine::types::Platform;
use skin_arb_engine::engine::Engine;
use skin_arb_engine::market_a::MarketAClient;
use skin_arb_engine::market_b::MarketBClient;
use skin_arb_engine::utils::ts_hm;
use skin_arb_engine::DynError;

const EX_CONFIG: i32 = 78;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Reads whatever credential material is present in the environment into
/// a `CredentialBag`. Credential storage UX is an out-of-scope
/// collaborator (spec.md §1); this is the minimal env-var loader that
/// feeds the in-scope `CredentialsStore`.
fn bag_from_env(cookie_keys: &[(&str, &str)], header_keys: &[(&str, &str)]) -> CredentialBag {
    let mut bag = CredentialBag::default();
    for (env_key, field) in cookie_keys {
        if let Ok(value) = std::env::var(env_key) {
            bag.cookies.insert((*field).to_string(), value);
        }
    }
    for (env_key, field) in header_keys {
        if let Ok(value) = std::env::var(env_key) {
            bag.headers.insert((*field).to_string(), value);
        }
    }
    bag
}

#[tokio::main]
async fn main() -> Result<(), DynError> {
    dotenv::dotenv().ok();

    let data_dir = PathBuf::from(env_or("DATA_DIR", "./data"));
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        eprintln!("[{}] data directory {} is not writable: {}", ts_hm(), data_dir.display(), e);
        std::process::exit(1);
    }

    let bag_a = bag_from_env(
        &[("MARKET_A_SESSION_COOKIE", "session"), ("MARKET_A_CSRF_COOKIE", "csrf_token")],
        &[("MARKET_A_AUTH_HEADER", "authorization")],
    );
    let bag_b = bag_from_env(
        &[],
        &[
            ("MARKET_B_DEVICE_ID", "deviceid"),
            ("MARKET_B_DEVICE_UK", "deviceuk"),
            ("MARKET_B_AUTHORIZATION", "authorization"),
        ],
    );

    if bag_a.headers.is_empty() && bag_a.cookies.is_empty() && bag_b.headers.is_empty() && bag_b.cookies.is_empty() {
        eprintln!(
            "[{}] no credentials configured for either marketplace (MARKET_A_*/MARKET_B_* env vars); refusing to start",
            ts_hm()
        );
        std::process::exit(EX_CONFIG);
    }

    let market_a = MarketAClient::new()?;
    let market_b = MarketBClient::new()?;
    let engine = Arc::new(Engine::new(data_dir, market_a, market_b));
    engine.credentials.set(Platform::A, bag_a).await;
    engine.credentials.set(Platform::B, bag_b).await;

    if let Err(e) = engine.hashname_cache.load().await {
        eprintln!("[{}] failed to load hashname cache, starting empty: {}", ts_hm(), e);
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let scheduler = Scheduler::new(engine.clone(), shutdown_rx);
    let (full_handle, incremental_handle) = scheduler.start();

    let http_addr: SocketAddr = env_or("HTTP_ADDR", "0.0.0.0:8080").parse()?;
    let http_engine = engine.clone();
    let http_handle = tokio::spawn(async move {
        if let Err(e) = skin_arb_engine::http::server::serve(http_addr, http_engine).await {
            eprintln!("[{}] [HTTP] server exited: {}", ts_hm(), e);
        }
    });

    println!("[{}] skin-arb-engine running, press Ctrl+C to stop", ts_hm());

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = sigterm.recv() => println!("\n[{}] [SHUTDOWN] received SIGTERM", ts_hm()),
            _ = tokio::signal::ctrl_c() => println!("\n[{}] [SHUTDOWN] received SIGINT", ts_hm()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        println!("\n[{}] [SHUTDOWN] received Ctrl+C", ts_hm());
    }

    let _ = shutdown_tx.send(true);
    engine.gate.force_stop_all().await;
    http_handle.abort();

    let _ = tokio::time::timeout(std::time::Duration::from_secs(10), async {
        let _ = full_handle.await;
        let _ = incremental_handle.await;
    })
    .await;

    println!("[{}] [SHUTDOWN] complete", ts_hm());
    Ok(())
}
