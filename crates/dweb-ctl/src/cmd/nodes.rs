//! Provider registration.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::http::{base_url, post_json_body};

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    service: &'a str,
    endpoint: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<&'a str>,
}

#[derive(Deserialize)]
struct RegisterResponse {
    id: String,
    parent: String,
}

pub async fn cmd_register(
    port: u16,
    service: &str,
    name: &str,
    endpoint: &str,
    parent: Option<&str>,
) -> Result<()> {
    let req = RegisterRequest {
        name,
        service,
        endpoint,
        parent,
    };
    let resp: RegisterResponse =
        post_json_body(&format!("{}/nodes", base_url(port)), &req).await?;

    println!("Registered {} for {}", name, service);
    println!("  id     : {}", resp.id);
    println!("  parent : {}", resp.parent);
    Ok(())
}
