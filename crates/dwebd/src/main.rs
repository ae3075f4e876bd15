//! dwebd: dweb provider-selection daemon.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use dweb_core::config::DwebConfig;
use dweb_services::{EventLog, StrategyKind, Topology, TopologyError};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = DwebConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = DwebConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        DwebConfig::default()
    });
    tracing::info!(path = %DwebConfig::file_path().display(), "dwebd starting");

    if let Err(e) = config.selection.default_strategy.parse::<StrategyKind>() {
        anyhow::bail!("invalid selection.default_strategy: {e}");
    }

    // Event log
    let event_log = Arc::new(
        EventLog::open(config.event_log.clone()).context("failed to open event log")?,
    );

    // Topology
    let topology = Topology::new();
    for service in &config.topology.services {
        match topology.create_root(service) {
            Ok(_) | Err(TopologyError::RootExists(_)) => {}
            Err(e) => tracing::warn!(error = %e, service, "failed to create service root"),
        }
    }
    tracing::info!(
        services = config.topology.services.len(),
        default_strategy = %config.selection.default_strategy,
        timeout_ms = config.selection.timeout_ms,
        "topology ready"
    );

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);
    let cancel = CancellationToken::new();

    {
        let shutdown = shutdown_tx.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            cancel.cancel();
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let topology_printer = {
        let topology = topology.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(30));
            loop {
                interval.tick().await;
                for (service, providers) in topology.services() {
                    tracing::info!(service, providers, "topology snapshot");
                }
            }
        })
    };

    // mDNS failures leave the API up.
    if config.mdns.enabled {
        let mdns = config.mdns.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let addrs = match dweb_services::mdns::external_ipv4() {
                Ok(addrs) => addrs,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to list interfaces, mDNS disabled");
                    return;
                }
            };
            if let Err(e) = dweb_services::mdns::serve(mdns, addrs, cancel).await {
                tracing::warn!(error = %e, "mDNS responder failed");
            }
        });
    }

    let api_task = {
        let state = dweb_api::ApiState {
            topology: topology.clone(),
            event_log: event_log.clone(),
            selection: config.selection.clone(),
            cancel: cancel.clone(),
            shutdown_tx: shutdown_tx.clone(),
        };
        let port = config.api.port;
        tokio::spawn(async move {
            if let Err(e) = dweb_api::serve(state, port).await {
                tracing::error!(error = %e, "API server failed");
            }
        })
    };

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv()   => tracing::info!("shutting down"),
        r = api_task             => tracing::error!("API task exited: {:?}", r),
        r = topology_printer     => tracing::error!("topology printer exited: {:?}", r),
    }

    cancel.cancel();
    event_log.shutdown().context("failed to close event log")?;
    Ok(())
}
