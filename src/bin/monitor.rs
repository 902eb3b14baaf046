//! Read-only operational probe for the engine's HTTP surface (§6).
//!
//! Grounded on the teacher's `src/bin/monitor.rs` (a standalone binary
//! that polls a running system's metrics endpoint over plain
//! `tokio::net::TcpStream` and prints a human-readable summary) but
//! pointed at this engine's `GET /status` and `GET /opportunities`
//! routes instead of the teacher's Prometheus-style `/metrics`. Useful
//! for smoke-testing a running instance without pulling in the engine's
//! own HTTP client dependencies beyond `reqwest`, which the binary
//! target already carries.
//!
//! ```bash
//! cargo run --bin monitor -- http://127.0.0.1:8080
//! ```

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct GateStatus {
    running: bool,
    analysis_id: Option<String>,
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpportunityRow {
    canonical_name: String,
    price_a: f64,
    price_b: f64,
    last_updated: i64,
}

#[derive(Debug, Deserialize)]
struct OpportunityListMetadata {
    total_count: usize,
    generated_at: i64,
}

#[derive(Debug, Deserialize)]
struct OpportunityList {
    metadata: Option<OpportunityListMetadata>,
    items: Vec<OpportunityRow>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let base_url = std::env::args().nth(1).unwrap_or_else(|| "http://127.0.0.1:8080".to_string());

    let client = reqwest::Client::builder().timeout(Duration::from_secs(5)).build()?;

    let status: GateStatus = client.get(format!("{base_url}/status")).send().await?.json().await?;
    println!("=== gate status ===");
    println!(
        "running={} kind={} id={}",
        status.running,
        status.kind.as_deref().unwrap_or("-"),
        status.analysis_id.as_deref().unwrap_or("-")
    );

    let opportunities: OpportunityList = client.get(format!("{base_url}/opportunities")).send().await?.json().await?;
    let total = opportunities
        .metadata
        .as_ref()
        .map(|m| m.total_count)
        .unwrap_or(opportunities.items.len());
    println!("\n=== opportunities ({total}) ===");
    for row in opportunities.items.iter().take(20) {
        println!(
            "{:<40} A={:>8.2} B={:>8.2} diff={:>7.2} updated={}",
            row.canonical_name,
            row.price_a,
            row.price_b,
            row.price_b - row.price_a,
            row.last_updated
        );
    }
    if opportunities.items.len() > 20 {
        println!("... {} more", opportunities.items.len() - 20);
    }

    Ok(())
}
