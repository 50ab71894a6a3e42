//! CLI error types.

use petchat_client::{StoreError, transport::RestError};
use petchat_core::ConnectionError;
use petchat_crypto::CryptoError;
use petchat_proto::ProtocolError;

/// Errors that end a CLI session.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Websocket base URL rejected.
    #[error("configuration error: {0}")]
    Connection(#[from] ConnectionError),

    /// Encryption key could not be decoded.
    #[error("invalid encryption key: {0}")]
    Key(#[from] CryptoError),

    /// Room name rejected.
    #[error("invalid room: {0}")]
    Room(#[from] ProtocolError),

    /// State database could not be opened or written.
    #[error("state store error: {0}")]
    Store(#[from] StoreError),

    /// REST call failed.
    #[error("api error: {0}")]
    Rest(#[from] RestError),

    /// Terminal I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
