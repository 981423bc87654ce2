//! Poll failure type.

use thiserror::Error;

use puma_control::FetchError;
use puma_core::{DecodeError, StatusKind};

/// One endpoint's poll produced no update.
///
/// Never fatal: the refresher logs it and waits for the next tick.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("fetching {kind}: {source}")]
    Fetch {
        kind: StatusKind,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Shutdown began before the update could be applied.
    #[error("refresher stopped, {kind} update discarded")]
    Stopped { kind: StatusKind },
}

impl PollError {
    /// Endpoint family the failed poll targeted.
    pub fn kind(&self) -> StatusKind {
        match self {
            PollError::Fetch { kind, .. } | PollError::Stopped { kind } => *kind,
            PollError::Decode(e) => match e {
                DecodeError::Malformed { kind, .. }
                | DecodeError::Shape { kind, .. }
                | DecodeError::Field { kind, .. } => *kind,
            },
        }
    }
}
