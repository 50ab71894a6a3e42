//! Client configuration.

use petchat_core::{ConnectionError, ReconnectPolicy, connection::endpoint_url};

/// Default websocket base used by the development backend.
pub const DEFAULT_WS_BASE: &str = "ws://localhost:8000/ws";

/// Where the sockets connect and how they retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    ws_base: String,
    /// Room socket reconnect policy.
    pub room_policy: ReconnectPolicy,
    /// Notification socket reconnect policy.
    pub notification_policy: ReconnectPolicy,
}

impl ClientConfig {
    /// Build a configuration for the given websocket base URL.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidUrl` if `ws_base` is not `ws://` or `wss://`
    pub fn new(ws_base: &str) -> Result<Self, ConnectionError> {
        endpoint_url(ws_base, "")?;

        Ok(Self {
            ws_base: ws_base.trim_end_matches('/').to_string(),
            room_policy: ReconnectPolicy::default(),
            notification_policy: ReconnectPolicy::notifications(),
        })
    }

    /// Websocket base URL without trailing slash.
    pub fn ws_base(&self) -> &str {
        &self.ws_base
    }

    /// Full URL for an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.ws_base, path.trim_start_matches('/'))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ws_base: DEFAULT_WS_BASE.to_string(),
            room_policy: ReconnectPolicy::default(),
            notification_policy: ReconnectPolicy::notifications(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn default_targets_local_backend() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint("chat/dogs/"), "ws://localhost:8000/ws/chat/dogs/");
        assert_eq!(config.room_policy.interval, Duration::from_secs(3));
        assert_eq!(config.notification_policy.interval, Duration::from_secs(1));
    }

    #[test]
    fn rejects_non_websocket_base() {
        assert!(ClientConfig::new("https://example.com").is_err());
        let config = ClientConfig::new("wss://example.com/ws/").unwrap();
        assert_eq!(config.ws_base(), "wss://example.com/ws");
    }
}
