//! Daemon status and shutdown commands.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json, post_json};

#[derive(Deserialize)]
struct StatusResponse {
    services: usize,
    nodes: usize,
    default_strategy: String,
    strategies: Vec<String>,
    event_log: String,
}

#[derive(Deserialize)]
struct ShutdownResponse {
    status: String,
}

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/status", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  dweb Daemon Status");
    println!("═══════════════════════════════════════");
    println!("  Services         : {}", resp.services);
    println!("  Nodes            : {}", resp.nodes);
    println!("  Default strategy : {}", resp.default_strategy);
    println!("  Strategies       : {}", resp.strategies.join(", "));
    println!("  Event log        : {}", resp.event_log);
    Ok(())
}

pub async fn cmd_shutdown(port: u16) -> Result<()> {
    let resp: ShutdownResponse =
        post_json(&format!("{}/daemon/shutdown", base_url(port))).await?;
    println!("Daemon: {}", resp.status);
    Ok(())
}
