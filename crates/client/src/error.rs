//! Error taxonomy for the driver.
//!
//! Remote errors stay scoped to the call that triggered them; a protocol
//! desync or transport failure is terminal for the whole connection and is
//! observed by every caller as `Error::Closed`.

use std::fmt;

use cdp::BrowserError;
use thiserror::Error;

use crate::transport::TransportError;

pub type Result<T> = std::result::Result<T, Error>;

/// Why the connection stopped.
#[derive(Debug, Clone)]
pub enum CloseReason {
    /// The transport closed without a protocol violation (remote close or a
    /// local `close()` call).
    Clean,
    /// The shared message stream can no longer be trusted.
    Desync(BrowserError),
    /// The transport itself failed.
    Transport(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Clean => write!(f, "connection closed"),
            CloseReason::Desync(error) => write!(f, "protocol desync: {error}"),
            CloseReason::Transport(message) => write!(f, "transport failed: {message}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// The browser answered this command with an error object.
    #[error(transparent)]
    Browser(#[from] BrowserError),

    /// The connection is down; the operation can no longer complete.
    #[error("{0}")]
    Closed(CloseReason),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    /// The response payload did not decode into the command's result type;
    /// indicates a codec bug, not a runtime condition.
    #[error("failed to decode {method} response: {source}")]
    Decode {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// An ambient connection/session context was required but is not
    /// installed.
    #[error("{0}")]
    Context(String),
}
