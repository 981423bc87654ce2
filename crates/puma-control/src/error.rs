//! Fetch error types.

use thiserror::Error;

/// Why a control app request produced no usable body.
///
/// URLs are stored with the token redacted.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No response: connect, DNS, handshake, or timeout failure.
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// The control app answered with a status code of 400 or above.
    #[error("{url} returned HTTP {status}")]
    Upstream { url: String, status: u16 },
}

impl FetchError {
    /// Upstream HTTP status, if a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Upstream { status, .. } => Some(*status),
            FetchError::Transport { .. } => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport { .. })
    }
}
