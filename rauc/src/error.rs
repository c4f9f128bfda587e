use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while talking to the RAUC daemon.
///
/// Transport problems, failures reported by the daemon and replies of an
/// unexpected shape are kept apart so callers can tell them from each other.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot reach the RAUC daemon: {0}")]
    Connection(#[source] zbus::Error),

    #[error("{operation} failed: {source}")]
    Call {
        operation: &'static str,
        #[source]
        source: zbus::Error,
    },

    /// The daemon finished the operation with a non-zero code.
    #[error("{message}")]
    Domain { code: i32, message: String },

    #[error("unexpected {operation} reply: {reason}")]
    Decode {
        operation: &'static str,
        reason: String,
    },

    #[error("notification stream closed while waiting for {operation} to complete")]
    ChannelClosed {
        operation: &'static str,
        #[source]
        source: Option<zbus::Error>,
    },

    #[error("{operation} did not complete within {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("{operation} was cancelled while waiting for completion")]
    Cancelled { operation: &'static str },

    #[error("invalid configuration{}: {reason}", .path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    Config {
        path: Option<PathBuf>,
        reason: String,
    },
}

impl Error {
    pub(crate) fn call(operation: &'static str, source: impl Into<zbus::Error>) -> Self {
        Error::Call {
            operation,
            source: source.into(),
        }
    }

    pub(crate) fn decode(operation: &'static str, reason: impl Into<String>) -> Self {
        Error::Decode {
            operation,
            reason: reason.into(),
        }
    }

    /// Completion code reported by the daemon, if this is a domain failure.
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Domain { code, .. } => Some(*code),
            _ => None,
        }
    }
}
