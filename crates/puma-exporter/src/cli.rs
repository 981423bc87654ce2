//! Command-line and environment configuration.

use std::path::PathBuf;

use clap::Parser;
use puma_core::{ConfigError, ExporterConfig, PartialConfig};

#[derive(Parser, Debug)]
#[command(
    name = "puma-exporter",
    version,
    about = "Prometheus exporter for the Puma control app"
)]
pub struct Cli {
    /// Address to serve /metrics on, as ip:port or host:port [default: 0.0.0.0:9235].
    #[arg(short = 'b', long, env = "BIND_ADDRESS")]
    pub bind_address: Option<String>,

    /// Base URL of the Puma control app [default: http://127.0.0.1:7353].
    #[arg(short = 'u', long, env = "CONTROL_URL")]
    pub control_url: Option<String>,

    /// Control app auth token.
    #[arg(short = 'a', long, env = "AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Puma mode: "single" or "cluster" [default: single].
    #[arg(long, env = "PUMA_MODE")]
    pub mode: Option<String>,

    /// Poll interval, e.g. "5s" or "500ms" [default: 5s].
    #[arg(long, env = "POLL_INTERVAL")]
    pub interval: Option<String>,

    /// Per-request timeout [default: 3s].
    #[arg(long, env = "FETCH_TIMEOUT")]
    pub timeout: Option<String>,

    /// Do not poll /gc-stats.
    #[arg(long, env = "NO_GC_STATS")]
    pub no_gc_stats: bool,

    /// TOML config file; flags and env vars override its values.
    #[arg(short = 'c', long, env = "PUMA_EXPORTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON.
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl Cli {
    /// The flag/env layer. Unset options leave lower layers in place.
    pub fn layer(&self) -> PartialConfig {
        PartialConfig {
            bind_address: self.bind_address.clone(),
            control_url: self.control_url.clone(),
            auth_token: self.auth_token.clone(),
            mode: self.mode.clone(),
            gc_stats: self.no_gc_stats.then_some(false),
            interval: self.interval.clone(),
            timeout: self.timeout.clone(),
        }
    }

    /// Defaults, then the config file, then flags and env vars.
    pub fn resolve(&self) -> Result<ExporterConfig, ConfigError> {
        let file = match &self.config {
            Some(path) => PartialConfig::from_file(path)?,
            None => PartialConfig::default(),
        };
        ExporterConfig::layered([&file, &self.layer()])
    }
}
