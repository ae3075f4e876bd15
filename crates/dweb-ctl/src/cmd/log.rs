//! Append a line to the daemon's event log.

use anyhow::{Result, bail};

use super::http::{base_url, post_text};

pub async fn cmd_log(port: u16, message: &str) -> Result<()> {
    if message.is_empty() {
        bail!("log message must not be empty");
    }
    post_text(&format!("{}/log", base_url(port)), message.to_string()).await?;
    println!("Logged.");
    Ok(())
}
