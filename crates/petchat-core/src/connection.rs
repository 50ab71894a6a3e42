//! Socket lifecycle state machine.
//!
//! Uses the action pattern: methods take transport events as input and return
//! actions for the driver to execute. The machine does no I/O and keeps no
//! clock, which makes reconnect timing and stale-event handling testable
//! without sockets.
//!
//! # State Machine
//!
//! ```text
//!                 connect                 Opened
//! ┌──────────────┐ ───────> ┌────────────┐ ──────> ┌───────────┐
//! │ Disconnected │          │ Connecting │         │ Connected │
//! └──────────────┘ <─────── └────────────┘         └───────────┘
//!        ↑    │     Closed        │ Failed               │
//!        │    │                   ↓                      │ Failed
//!        │    │ ReconnectDue ┌───────┐ <─────────────────┘
//!        │    └────────────> │ Error │
//!        │      (attempts    └───────┘
//!        │       remaining)      │ Closed
//!        └───────────────────────┘
//! ```
//!
//! # Epochs
//!
//! Every `connect`, `disconnect` and reconnect bumps the epoch. Actions carry
//! the epoch they were issued under and the driver tags every transport event
//! and timer with it. Events tagged with an older epoch are dropped, so a
//! socket that was replaced or a timer that was cancelled can never reach
//! handlers or reopen a connection.

use std::time::Duration;

use petchat_proto::{CloseCode, CloseKind, RoomName, UserId};
use tracing::{debug, info, trace, warn};

use crate::ConnectionError;

/// Maximum consecutive reconnect attempts without reaching `Connected`.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Delay between room socket reconnect attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(3);

/// Delay between notification socket reconnect attempts.
pub const NOTIFICATION_RECONNECT_INTERVAL: Duration = Duration::from_secs(1);

/// Generation counter for a connection.
pub type Epoch = u64;

/// Something a socket can be connected to.
pub trait Target: Clone + PartialEq + std::fmt::Debug + Send + 'static {
    /// Path of the endpoint relative to the websocket base URL.
    fn endpoint_path(&self) -> String;
}

impl Target for RoomName {
    fn endpoint_path(&self) -> String {
        format!("chat/{}/", self.as_str())
    }
}

impl Target for UserId {
    fn endpoint_path(&self) -> String {
        format!("notifications/{}/", self.0)
    }
}

/// Join a websocket base URL and an endpoint path.
///
/// # Errors
///
/// - `ConnectionError::InvalidUrl` if `base` is not a `ws://` or `wss://` URL
pub fn endpoint_url(base: &str, path: &str) -> Result<String, ConnectionError> {
    let scheme_ok = base.starts_with("ws://") || base.starts_with("wss://");
    let host_ok = base.split_once("://").is_some_and(|(_, rest)| !rest.is_empty());

    if !(scheme_ok && host_ok) {
        return Err(ConnectionError::InvalidUrl(base.to_string()));
    }

    Ok(format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/')))
}

/// Lifecycle state of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No transport, or the last one closed.
    Disconnected,
    /// Transport opening.
    Connecting,
    /// Transport open. Frames may be sent.
    Connected,
    /// Transport reported an error and is about to close.
    Error,
}

/// Status transitions reported to connection handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// A transport is being opened.
    Connecting,
    /// The transport is open.
    Connected,
    /// The transport closed.
    Disconnected,
    /// The transport reported an error.
    Error {
        /// Driver-supplied description.
        reason: String,
    },
    /// The server rejected the session. Not retried.
    AuthError,
}

impl ConnectionStatus {
    /// Short label matching the status names used by the UI.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error { .. } => "error",
            Self::AuthError => "auth_error",
        }
    }
}

/// Fixed-interval reconnect policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Consecutive attempts allowed before giving up.
    pub max_attempts: u32,
    /// Constant delay before each attempt.
    pub interval: Duration,
}

impl ReconnectPolicy {
    /// Policy used by the notification socket.
    pub fn notifications() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, interval: NOTIFICATION_RECONNECT_INTERVAL }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, interval: DEFAULT_RECONNECT_INTERVAL }
    }
}

/// Actions returned by the connection state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open a transport to `path` and tag its events with `epoch`.
    Open {
        /// Epoch of the new transport.
        epoch: Epoch,
        /// Endpoint path relative to the base URL.
        path: String,
    },
    /// Close the transport opened under `epoch`.
    Close {
        /// Epoch of the transport to close.
        epoch: Epoch,
        /// Close code to send.
        code: CloseCode,
        /// Close reason to send.
        reason: &'static str,
    },
    /// Deliver `TransportEvent::ReconnectDue` tagged with `epoch` after
    /// `delay`.
    ScheduleReconnect {
        /// Epoch the timer belongs to.
        epoch: Epoch,
        /// Delay before firing.
        delay: Duration,
        /// Attempt number, starting at 1.
        attempt: u32,
    },
    /// Drop the timer scheduled under `epoch`.
    CancelReconnect {
        /// Epoch the timer belongs to.
        epoch: Epoch,
    },
    /// Report a status transition to connection handlers.
    Status(ConnectionStatus),
}

/// Events the driver feeds back into the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake completed.
    Opened,
    /// A text frame arrived.
    Text(String),
    /// The transport closed. Always the last event of a transport.
    Closed {
        /// Close code from the peer, or 1006 if none was received.
        code: CloseCode,
    },
    /// The transport failed. Always followed by `Closed`.
    Failed {
        /// Description of the failure.
        reason: String,
    },
    /// A scheduled reconnect timer fired.
    ReconnectDue,
}

/// Connection lifecycle for one socket client.
///
/// Owns the target, the reconnect counter and the epoch. At most one
/// transport is live at a time: `connect` closes the previous one before
/// opening the next.
#[derive(Debug, Clone)]
pub struct Connection<T: Target> {
    state: LinkState,
    status: ConnectionStatus,
    target: Option<T>,
    attempts: u32,
    epoch: Epoch,
    /// A transport is open or opening under the current epoch.
    live: bool,
    reconnect_pending: bool,
    policy: ReconnectPolicy,
}

impl<T: Target> Connection<T> {
    /// Create an idle connection.
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: LinkState::Disconnected,
            status: ConnectionStatus::Disconnected,
            target: None,
            attempts: 0,
            epoch: 0,
            live: false,
            reconnect_pending: false,
            policy,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Last status reported to handlers.
    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    /// Stored target, if any.
    pub fn target(&self) -> Option<&T> {
        self.target.as_ref()
    }

    /// Consecutive reconnect attempts since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Current epoch.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Reconnect policy.
    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    /// Whether frames may be sent.
    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    /// Whether a reconnect timer is outstanding.
    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// Whether a text frame delivered under `epoch` belongs to the current
    /// open transport.
    pub fn accepts_frames(&self, epoch: Epoch) -> bool {
        epoch == self.epoch && self.state == LinkState::Connected
    }

    /// Open a transport to `target`, replacing any live one.
    ///
    /// Resets the attempt counter: an explicit connect starts a fresh retry
    /// budget.
    pub fn connect(&mut self, target: T) -> Vec<ConnectionAction> {
        let mut actions = self.teardown("client replaced");

        self.epoch += 1;
        self.attempts = 0;
        self.target = Some(target);
        self.open(&mut actions);

        actions
    }

    /// Close the live transport, cancel any pending reconnect and clear the
    /// target. Idempotent.
    pub fn disconnect(&mut self) -> Vec<ConnectionAction> {
        if self.target.is_none() && !self.live && !self.reconnect_pending {
            return Vec::new();
        }

        let mut actions = self.teardown("User disconnected");

        self.epoch += 1;
        self.target = None;
        self.attempts = 0;

        if self.state != LinkState::Disconnected {
            self.state = LinkState::Disconnected;
            self.report(&mut actions, ConnectionStatus::Disconnected);
        }

        actions
    }

    /// Process a transport event tagged with `epoch`.
    ///
    /// Events from older epochs are dropped. `Text` never changes state; the
    /// owning client checks [`Connection::accepts_frames`] and parses it.
    pub fn handle(&mut self, epoch: Epoch, event: &TransportEvent) -> Vec<ConnectionAction> {
        if epoch != self.epoch {
            trace!(epoch, current = self.epoch, ?event, "dropping stale transport event");
            return Vec::new();
        }

        let mut actions = Vec::new();

        match event {
            TransportEvent::Opened if self.live => {
                info!(endpoint = ?self.target, epoch, "socket connected");
                self.state = LinkState::Connected;
                self.attempts = 0;
                self.report(&mut actions, ConnectionStatus::Connected);
            },
            TransportEvent::Failed { reason } if self.live => {
                warn!(endpoint = ?self.target, epoch, %reason, "socket error");
                self.state = LinkState::Error;
                self.report(&mut actions, ConnectionStatus::Error { reason: reason.clone() });
            },
            TransportEvent::Closed { code } if self.live => {
                info!(endpoint = ?self.target, epoch, %code, "socket closed");
                self.live = false;
                self.state = LinkState::Disconnected;
                self.report(&mut actions, ConnectionStatus::Disconnected);

                match code.kind() {
                    CloseKind::Normal => {},
                    CloseKind::AuthFailure => {
                        warn!(endpoint = ?self.target, "socket authentication failed");
                        self.report(&mut actions, ConnectionStatus::AuthError);
                    },
                    CloseKind::Abnormal => self.schedule_reconnect(&mut actions),
                }
            },
            TransportEvent::ReconnectDue if self.reconnect_pending => {
                self.reconnect_pending = false;

                if self.target.is_some() {
                    debug!(endpoint = ?self.target, attempt = self.attempts, "reconnecting");
                    self.epoch += 1;
                    self.open(&mut actions);
                }
            },
            _ => {
                trace!(epoch, ?event, state = ?self.state, "ignoring transport event");
            },
        }

        actions
    }

    fn open(&mut self, actions: &mut Vec<ConnectionAction>) {
        let Some(target) = &self.target else {
            return;
        };

        let path = target.endpoint_path();
        debug!(epoch = self.epoch, %path, "opening socket");

        self.live = true;
        self.state = LinkState::Connecting;
        actions.push(ConnectionAction::Open { epoch: self.epoch, path });
        self.report(actions, ConnectionStatus::Connecting);
    }

    fn teardown(&mut self, reason: &'static str) -> Vec<ConnectionAction> {
        let mut actions = Vec::new();

        if self.live {
            self.live = false;
            actions.push(ConnectionAction::Close {
                epoch: self.epoch,
                code: CloseCode::NORMAL,
                reason,
            });
        }

        if self.reconnect_pending {
            self.reconnect_pending = false;
            actions.push(ConnectionAction::CancelReconnect { epoch: self.epoch });
        }

        actions
    }

    fn schedule_reconnect(&mut self, actions: &mut Vec<ConnectionAction>) {
        if self.target.is_none() {
            return;
        }

        if self.attempts >= self.policy.max_attempts {
            warn!(
                endpoint = ?self.target,
                attempts = self.attempts,
                "reconnect attempts exhausted, staying disconnected"
            );
            return;
        }

        self.attempts += 1;
        self.reconnect_pending = true;

        debug!(
            epoch = self.epoch,
            attempt = self.attempts,
            max = self.policy.max_attempts,
            delay = ?self.policy.interval,
            "scheduling reconnect"
        );

        actions.push(ConnectionAction::ScheduleReconnect {
            epoch: self.epoch,
            delay: self.policy.interval,
            attempt: self.attempts,
        });
    }

    fn report(&mut self, actions: &mut Vec<ConnectionAction>, status: ConnectionStatus) {
        self.status = status.clone();
        actions.push(ConnectionAction::Status(status));
    }
}
