//! puma-control — client for the Puma control app.
//!
//! Issues a single bounded-timeout HTTP GET per call against
//! `{control_url}/stats` or `{control_url}/gc-stats`, carrying the auth
//! token as the `token` query parameter. There are no retries; each call
//! either yields the response body or a [`FetchError`].
//!
//! ```text
//! ControlClient
//!   ├── endpoint_url(kind) → {base}/{path}?token=…
//!   └── fetch(url) → Bytes | FetchError::{Transport, Upstream}
//! ```

pub mod client;
pub mod error;

pub use client::{ControlClient, redact};
pub use error::FetchError;
