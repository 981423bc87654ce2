//! Error types for decoding and configuration.

use thiserror::Error;

use crate::types::StatusKind;

/// A control app response that could not be mapped onto its schema.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body is not valid JSON.
    #[error("malformed {kind} document: {source}")]
    Malformed {
        kind: StatusKind,
        #[source]
        source: serde_json::Error,
    },

    /// Valid JSON, but not an object.
    #[error("unexpected {kind} document shape: expected an object, found {found}")]
    Shape {
        kind: StatusKind,
        found: &'static str,
    },

    /// A field holds a value of the wrong type. `path` locates it,
    /// e.g. `worker_status[1].last_status.backlog`.
    #[error("invalid field `{path}` in {kind} document: {source}")]
    Field {
        kind: StatusKind,
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating the exporter configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid bind address {0:?}")]
    BindAddress(String),

    #[error("invalid control url {url:?}: {reason}")]
    ControlUrl { url: String, reason: String },

    #[error("invalid duration {0:?} (expected e.g. \"500ms\", \"5s\", \"2m\")")]
    Duration(String),

    #[error("invalid mode {0:?} (expected \"single\" or \"cluster\")")]
    Mode(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}
