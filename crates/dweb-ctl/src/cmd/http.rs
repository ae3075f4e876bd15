//! Shared HTTP request helpers for CLI commands.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{}/api", port)
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

/// Decode a JSON body, turning API error bodies into readable errors.
async fn decode<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(err) => bail!("{} ({}): {}", status, err.error, err.message),
            Err(_) => bail!("{}: {}", status, text),
        }
    }
    resp.json::<T>().await.context("failed to parse response")
}

fn connect_error(url: &str) -> String {
    format!("failed to connect to dwebd at {}; is it running?", url)
}

pub async fn get_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    let resp = reqwest::get(url).await.with_context(|| connect_error(url))?;
    decode(resp).await
}

pub async fn post_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    let resp = reqwest::Client::new()
        .post(url)
        .send()
        .await
        .with_context(|| connect_error(url))?;
    decode(resp).await
}

pub async fn post_json_body<T, R>(url: &str, body: &T) -> Result<R>
where
    T: Serialize,
    R: for<'de> Deserialize<'de>,
{
    let resp = reqwest::Client::new()
        .post(url)
        .json(body)
        .send()
        .await
        .with_context(|| connect_error(url))?;
    decode(resp).await
}

/// POST a raw text body; only the status matters.
pub async fn post_text(url: &str, body: String) -> Result<()> {
    let resp = reqwest::Client::new()
        .post(url)
        .body(body)
        .send()
        .await
        .with_context(|| connect_error(url))?;
    let status = resp.status();
    if !status.is_success() {
        bail!("{}: {}", status, resp.text().await.unwrap_or_default());
    }
    Ok(())
}
