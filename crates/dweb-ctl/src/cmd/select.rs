//! Provider selection.

use anyhow::{Context, Result, anyhow};
use reqwest::Url;
use serde::Deserialize;

use super::http::{base_url, get_json};

#[derive(Deserialize)]
struct SelectResponse {
    service: String,
    strategy: String,
    node: NodeInfo,
    evaluations: usize,
}

#[derive(Deserialize)]
#[allow(dead_code)]
struct NodeInfo {
    id: String,
    owner_key: String,
    name: String,
    service: String,
    endpoint: String,
    status: NodeStatus,
    children: Vec<String>,
}

#[derive(Deserialize)]
struct NodeStatus {
    latency_score: u8,
    disconnect_count: u8,
    fee: f32,
    pledge: u16,
}

/// `/select/{service}[?strategy=..]`, with both parts percent-encoded.
fn select_url(port: u16, service: &str, strategy: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(&base_url(port)).context("invalid base url")?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("base url cannot take path segments"))?
        .push("select")
        .push(service);
    if let Some(strategy) = strategy {
        url.query_pairs_mut().append_pair("strategy", strategy);
    }
    Ok(url)
}

pub async fn cmd_select(port: u16, service: &str, strategy: Option<&str>) -> Result<()> {
    let url = select_url(port, service, strategy)?;
    let resp: SelectResponse = get_json(url.as_str()).await?;
    let node = &resp.node;

    println!("┌─ {} ({})", resp.service, resp.strategy);
    println!("│  Node      : {} ({})", node.name, short(&node.id));
    println!("│  Endpoint  : {}", node.endpoint);
    println!(
        "│  Latency   : {}   Disconnects: {}",
        node.status.latency_score, node.status.disconnect_count
    );
    println!("│  Fee       : {}   Pledge: {}", node.status.fee, node.status.pledge);
    println!("└─ {} node(s) evaluated", resp.evaluations);
    Ok(())
}

fn short(id: &str) -> &str {
    &id[..id.len().min(16)]
}
