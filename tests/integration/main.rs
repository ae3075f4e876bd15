//! dweb integration test harness.
//!
//! Each API test boots the router on an ephemeral loopback port with its own
//! topology and event log directory, so tests run in parallel.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use dweb_core::config::{EventLogConfig, SelectionConfig};
use dweb_services::{EventLog, Topology};

// ── Harness ───────────────────────────────────────────────────────────────────

/// A running API server backed by in-process state.
pub struct TestDaemon {
    /// Server origin, `http://127.0.0.1:<port>`.
    pub origin: String,
    /// `origin` plus `/api`.
    pub base: String,
    pub topology: Topology,
    pub event_log: Arc<EventLog>,
    pub log_dir: PathBuf,
    pub shutdown_tx: tokio::sync::broadcast::Sender<()>,
    pub server: JoinHandle<Result<()>>,
}

/// Fresh scratch directory under the system temp dir.
pub fn scratch_dir(tag: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "dweb-it-{}-{}-{}",
        tag,
        std::process::id(),
        nanos
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub async fn start_daemon(tag: &str, selection: SelectionConfig) -> Result<TestDaemon> {
    let log = EventLogConfig {
        compress: false,
        ..EventLogConfig::default()
    };
    start_daemon_with_log(tag, selection, log).await
}

/// Like `start_daemon` with custom rotation settings. `log.path` is replaced
/// by a file in the daemon's scratch directory.
pub async fn start_daemon_with_log(
    tag: &str,
    selection: SelectionConfig,
    log: EventLogConfig,
) -> Result<TestDaemon> {
    let log_dir = scratch_dir(tag);
    let event_log = Arc::new(EventLog::open(EventLogConfig {
        path: log_dir.join("events.log"),
        ..log
    })?);
    let topology = Topology::new();
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    let state = dweb_api::ApiState {
        topology: topology.clone(),
        event_log: event_log.clone(),
        selection,
        cancel: CancellationToken::new(),
        shutdown_tx: shutdown_tx.clone(),
    };

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(dweb_api::serve_on(state, listener));

    let origin = format!("http://{}", addr);
    Ok(TestDaemon {
        base: format!("{origin}/api"),
        origin,
        topology,
        event_log,
        log_dir,
        shutdown_tx,
        server,
    })
}

impl TestDaemon {
    pub async fn get(&self, path: &str) -> Result<(u16, Value)> {
        let resp = reqwest::get(format!("{}{}", self.base, path))
            .await
            .with_context(|| format!("GET {path}"))?;
        decode(resp).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<(u16, Value)> {
        let resp = reqwest::Client::new()
            .post(format!("{}{}", self.base, path))
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {path}"))?;
        decode(resp).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<(u16, Value)> {
        let resp = reqwest::Client::new()
            .put(format!("{}{}", self.base, path))
            .json(body)
            .send()
            .await
            .with_context(|| format!("PUT {path}"))?;
        decode(resp).await
    }

    pub async fn delete(&self, path: &str) -> Result<(u16, Value)> {
        let resp = reqwest::Client::new()
            .delete(format!("{}{}", self.base, path))
            .send()
            .await
            .with_context(|| format!("DELETE {path}"))?;
        decode(resp).await
    }

    /// Register a provider and return its id.
    pub async fn register(
        &self,
        service: &str,
        name: &str,
        parent: Option<&str>,
        status: Value,
    ) -> Result<String> {
        let mut body = serde_json::json!({
            "name": name,
            "service": service,
            "endpoint": format!("https://{name}.example"),
            "status": status,
        });
        if let Some(parent) = parent {
            body["parent"] = Value::from(parent);
        }
        let (code, resp) = self.post("/nodes", &body).await?;
        anyhow::ensure!(code == 200, "register {name} failed: {code} {resp}");
        resp["id"]
            .as_str()
            .map(str::to_string)
            .context("register response missing id")
    }

    /// Parsed lines of the active event log.
    pub fn events(&self) -> Vec<Value> {
        std::fs::read_to_string(self.event_log.path())
            .unwrap_or_default()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        let _ = std::fs::remove_dir_all(&self.log_dir);
    }
}

async fn decode(resp: reqwest::Response) -> Result<(u16, Value)> {
    let code = resp.status().as_u16();
    let text = resp.text().await?;
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    Ok((code, body))
}

pub fn status(latency: u8, disconnects: u8, fee: f32, pledge: u16) -> Value {
    serde_json::json!({
        "latency_score": latency,
        "disconnect_count": disconnects,
        "fee": fee,
        "pledge": pledge,
    })
}

// ── Test modules ──────────────────────────────────────────────────────────────

mod api;
mod event_log;
