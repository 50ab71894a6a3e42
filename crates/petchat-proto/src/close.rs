//! WebSocket close codes.
//!
//! The room and notification endpoints use two private-range codes on top of
//! the RFC 6455 ones: 4001 when the session is not authenticated and 4000 for
//! any other server-side failure during the handshake.

use std::fmt;

/// A WebSocket close code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CloseCode(pub u16);

/// How the client should react to a close code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    /// User-requested closure. No reconnect.
    Normal,
    /// Authentication rejected. Surfaced separately, never retried.
    AuthFailure,
    /// Anything else. Eligible for reconnect.
    Abnormal,
}

impl CloseCode {
    /// Normal closure.
    pub const NORMAL: Self = Self(1000);

    /// Endpoint going away (page unload, server restart).
    pub const GOING_AWAY: Self = Self(1001);

    /// Close frame carried no status code.
    pub const NO_STATUS: Self = Self(1005);

    /// Transport dropped without a close frame.
    pub const ABNORMAL: Self = Self(1006);

    /// Server failed while accepting the connection.
    pub const SERVER_ERROR: Self = Self(4000);

    /// Session is not authenticated.
    pub const AUTH_FAILED: Self = Self(4001);

    /// Classify this code for the reconnect policy.
    pub fn kind(self) -> CloseKind {
        match self {
            Self::NORMAL => CloseKind::Normal,
            Self::AUTH_FAILED => CloseKind::AuthFailure,
            _ => CloseKind::Abnormal,
        }
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_1000_is_normal() {
        assert_eq!(CloseCode::NORMAL.kind(), CloseKind::Normal);
        assert_eq!(CloseCode::GOING_AWAY.kind(), CloseKind::Abnormal);
        assert_eq!(CloseCode::ABNORMAL.kind(), CloseKind::Abnormal);
    }

    #[test]
    fn auth_code_is_distinguished_from_server_error() {
        assert_eq!(CloseCode::AUTH_FAILED.kind(), CloseKind::AuthFailure);
        assert_eq!(CloseCode::SERVER_ERROR.kind(), CloseKind::Abnormal);
    }
}
