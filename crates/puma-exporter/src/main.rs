//! puma-exporter — Prometheus exporter for the Puma control app.
//!
//! Polls `/stats` (and `/gc-stats`) on a fixed interval and serves the
//! translated gauges on `/metrics`.
//!
//! # Usage
//!
//! ```text
//! puma-exporter -u http://127.0.0.1:7353 -a $PUMA_CONTROL_TOKEN --mode cluster
//! ```

mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use puma_control::{ControlClient, redact};
use puma_core::ExporterConfig;
use puma_metrics::{PumaMetrics, RefreshPlan, Refresher};

use crate::cli::Cli;

const DEFAULT_LOG_FILTER: &str = "info,puma_exporter=debug,puma_metrics=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = cli.resolve().context("invalid configuration")?;
    run(config).await
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(config: ExporterConfig) -> anyhow::Result<()> {
    let client = ControlClient::from_config(&config)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        control_url = %redact(&client.endpoint_url(config.mode.stats_kind())),
        mode = %config.mode,
        gc_stats = config.gc_stats,
        "puma exporter starting"
    );

    // ── Metrics + refresher ────────────────────────────────────

    let metrics = Arc::new(PumaMetrics::new().context("failed to register metrics")?);
    let refresher = Refresher::new(client, metrics.clone(), RefreshPlan::from_config(&config));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresher_handle = tokio::spawn(async move {
        refresher.run(shutdown_rx).await;
    });

    // ── HTTP server ────────────────────────────────────────────

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "serving /metrics");

    let router = puma_api::build_router(metrics);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    let _ = refresher_handle.await;

    info!("puma exporter stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
