//! puma-core — shared types for the Puma exporter.
//!
//! Holds the decoded shapes of the Puma control app's JSON responses,
//! the decoder that maps raw bytes onto them, and the exporter
//! configuration.
//!
//! # Response families
//!
//! | Endpoint | Mode | Shape |
//! |---|---|---|
//! | `/stats` | single | [`Stats`] |
//! | `/stats` | cluster | [`ClusterStats`] |
//! | `/gc-stats` | any | [`GcStats`] |
//!
//! The family is always chosen by the caller through [`StatusKind`];
//! a document is never inspected to guess which one it is.

pub mod config;
pub mod decode;
pub mod error;
pub mod types;

pub use config::{ExporterConfig, Mode, PartialConfig};
pub use decode::decode;
pub use error::{ConfigError, DecodeError};
pub use types::*;
