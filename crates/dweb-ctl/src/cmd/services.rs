//! Service type listing.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json};

#[derive(Deserialize)]
struct ServicesResponse {
    services: Vec<ServiceInfo>,
}

#[derive(Deserialize)]
struct ServiceInfo {
    service: String,
    providers: usize,
}

pub async fn cmd_services(port: u16) -> Result<()> {
    let resp: ServicesResponse = get_json(&format!("{}/services", base_url(port))).await?;

    if resp.services.is_empty() {
        println!("No services registered.");
        return Ok(());
    }

    println!("{} service(s)", resp.services.len());
    println!();
    for s in &resp.services {
        println!("  {:<24} {} provider(s)", s.service, s.providers);
    }
    Ok(())
}
