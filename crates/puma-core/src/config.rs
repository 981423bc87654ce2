//! Exporter configuration.
//!
//! A config is assembled from layers of [`PartialConfig`] (TOML file,
//! environment, command line) applied over [`ExporterConfig::default`],
//! then validated once.

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::types::StatusKind;

/// Which `/stats` response family the upstream server produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// One process; flat `{running, backlog}` stats.
    #[default]
    Single,
    /// Puma cluster mode; per-worker `worker_status` list.
    Cluster,
}

impl Mode {
    /// Schema used to decode `/stats` in this mode.
    pub fn stats_kind(&self) -> StatusKind {
        match self {
            Mode::Single => StatusKind::Stats,
            Mode::Cluster => StatusKind::ClusterStats,
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Mode::Single),
            "cluster" | "clustered" => Ok(Mode::Cluster),
            _ => Err(ConfigError::Mode(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Single => "single",
            Mode::Cluster => "cluster",
        })
    }
}

/// Fully resolved exporter configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExporterConfig {
    /// Listen address for the `/metrics` endpoint.
    pub bind_address: String,
    /// Base URL of the Puma control app.
    pub control_url: String,
    /// Sent as the `token` query parameter.
    pub auth_token: String,
    pub mode: Mode,
    /// Whether `/gc-stats` is polled.
    pub gc_stats: bool,
    /// Time between polls.
    pub interval: Duration,
    /// Bound on a single control app request.
    pub timeout: Duration,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9235".to_string(),
            control_url: "http://127.0.0.1:7353".to_string(),
            auth_token: String::new(),
            mode: Mode::Single,
            gc_stats: true,
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(3),
        }
    }
}

/// One configuration layer. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    pub bind_address: Option<String>,
    pub control_url: Option<String>,
    pub auth_token: Option<String>,
    pub mode: Option<String>,
    pub gc_stats: Option<bool>,
    /// Duration string: "500ms", "5s", "2m", or bare seconds.
    pub interval: Option<String>,
    pub timeout: Option<String>,
}

impl PartialConfig {
    /// Read a TOML config file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

impl ExporterConfig {
    /// Apply `layers` in order (later wins) over the defaults and validate.
    pub fn layered<'a, I>(layers: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = &'a PartialConfig>,
    {
        let mut config = Self::default();
        for layer in layers {
            config.apply(layer)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, layer: &PartialConfig) -> ConfigResult<()> {
        if let Some(v) = &layer.bind_address {
            self.bind_address = v.clone();
        }
        if let Some(v) = &layer.control_url {
            self.control_url = v.clone();
        }
        if let Some(v) = &layer.auth_token {
            self.auth_token = v.clone();
        }
        if let Some(v) = &layer.mode {
            self.mode = v.parse()?;
        }
        if let Some(v) = layer.gc_stats {
            self.gc_stats = v;
        }
        if let Some(v) = &layer.interval {
            self.interval = parse_duration(v).ok_or_else(|| ConfigError::Duration(v.clone()))?;
        }
        if let Some(v) = &layer.timeout {
            self.timeout = parse_duration(v).ok_or_else(|| ConfigError::Duration(v.clone()))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.bind_addr()?;
        self.control_base()?;
        if self.interval.is_zero() {
            return Err(ConfigError::Zero("interval"));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Zero("timeout"));
        }
        Ok(())
    }

    /// Listen address. `host:port` is resolved; the first address wins.
    pub fn bind_addr(&self) -> ConfigResult<SocketAddr> {
        if let Ok(addr) = self.bind_address.parse() {
            return Ok(addr);
        }
        self.bind_address
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| ConfigError::BindAddress(self.bind_address.clone()))
    }

    /// Parsed control app base URL.
    pub fn control_base(&self) -> ConfigResult<Url> {
        let invalid = |reason: &str| ConfigError::ControlUrl {
            url: self.control_url.clone(),
            reason: reason.to_string(),
        };
        let url = Url::parse(&self.control_url).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "http" {
            return Err(invalid("only http:// control URLs are supported"));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host"));
        }
        if url.query().is_some() {
            return Err(invalid("query string not allowed; use auth_token"));
        }
        Ok(url)
    }
}

/// Parse a duration string like "5s", "500ms", "1m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
