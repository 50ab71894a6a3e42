//! Error types for socket setup and transport.
//!
//! The public socket API never returns these: transport failures surface as
//! status transitions. They are used at the driver boundary, where an
//! endpoint URL is built and a socket is dialled, and converted to a failure
//! reason string before reaching the state machine.

use thiserror::Error;

/// Errors raised while building or running a socket transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Base URL is not a `ws://` or `wss://` URL.
    #[error("invalid websocket url: {0}")]
    InvalidUrl(String),

    /// Handshake rejected by the server with an HTTP status.
    #[error("handshake rejected with status {0}")]
    Rejected(u16),

    /// Underlying transport error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Protocol error while encoding an outbound frame.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ConnectionError {
    /// Returns true if this error may succeed on retry.
    ///
    /// A malformed URL or an encoding bug will fail the same way every time.
    /// Network errors and server rejections may clear up.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Rejected(_))
    }
}

impl From<petchat_proto::ProtocolError> for ConnectionError {
    fn from(err: petchat_proto::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}
