//! Protocol error types.

use thiserror::Error;

/// Errors produced while parsing or encoding socket frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame is not valid JSON or does not match the shape of its tag.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// Frame is a JSON value without a string `type` field.
    #[error("frame has no type tag")]
    MissingType,

    /// Frame carries a `type` this client does not handle.
    #[error("unknown frame type: {0}")]
    UnknownType(String),

    /// Room name does not match the backend route pattern `[\w-]+`.
    #[error("invalid room name: {0:?}")]
    InvalidRoomName(String),

    /// Outbound frame could not be serialized.
    #[error("failed to encode frame: {0}")]
    Encode(String),
}

impl ProtocolError {
    /// Returns true if the frame was well formed but simply not understood.
    ///
    /// Unknown tags are expected when the server is newer than the client and
    /// are logged at a lower level than genuinely malformed input.
    pub fn is_unknown_type(&self) -> bool {
        matches!(self, Self::UnknownType(_))
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unknown_type_is_classified_as_unknown() {
        assert!(ProtocolError::UnknownType("pong".into()).is_unknown_type());
        assert!(!ProtocolError::MissingType.is_unknown_type());
        assert!(!ProtocolError::Malformed("eof".into()).is_unknown_type());
    }
}
