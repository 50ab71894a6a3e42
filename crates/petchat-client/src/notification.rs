//! Notification socket client.
//!
//! One long-lived connection per authenticated user at
//! `{ws_base}/notifications/{user_id}/`, independent of any open room.
//!
//! # Routing
//!
//! - `chat_message_notification` for a chat in the [`ActiveChats`] set is not
//!   published. A read receipt is requested for that chat instead, since the
//!   user is already looking at it.
//! - `chat_message_notification` for any other chat goes to message handlers.
//! - `new_chat_created` and `user_invited` go to new-chat handlers.
//! - `pong` is consumed silently.

use petchat_core::{
    Connection, ConnectionStatus, Epoch, EventBus, LinkState, Subscription, TransportEvent,
};
use petchat_proto::{MessageNotificationFrame, NotificationCommand, NotificationFrame, UserId};
use tracing::{debug, trace, warn};

use crate::{
    ActiveChats, ClientConfig, Driver, NewChatNotice, NotificationEvent, NotificationEventKind,
    driver::Link,
    lifecycle::Disconnect,
};

/// Client for the per-user notification socket.
pub struct NotificationSocket<D: Driver> {
    link: Link<UserId, D>,
    active: ActiveChats,
    bus: EventBus<NotificationEvent>,
}

impl<D: Driver> NotificationSocket<D> {
    /// Create a disconnected client that filters against `active`.
    pub fn new(driver: D, config: ClientConfig, active: ActiveChats) -> Self {
        let conn = Connection::new(config.notification_policy);
        Self { link: Link::new(conn, driver, config), active, bus: EventBus::new() }
    }

    /// Connect for `user`.
    ///
    /// No-op if already connecting or connected for the same user. A
    /// different user replaces the current connection.
    pub fn connect(&mut self, user: UserId) {
        let busy = matches!(self.link.conn.state(), LinkState::Connecting | LinkState::Connected);
        if busy && self.link.conn.target() == Some(&user) {
            trace!(%user, "notification socket already open");
            return;
        }

        debug!(%user, "connecting notification socket");
        let statuses = self.link.connect(user);
        self.publish_statuses(statuses);
    }

    /// Close the connection and forget the user.
    pub fn disconnect(&mut self) {
        let statuses = self.link.disconnect();
        self.publish_statuses(statuses);
    }

    /// Send an arbitrary JSON value. Best effort.
    ///
    /// Returns false and sends nothing unless connected.
    pub fn send(&mut self, data: &serde_json::Value) -> bool {
        if !self.link.conn.is_connected() {
            return false;
        }
        self.link.send(data.to_string())
    }

    /// Send a keepalive `ping` carrying `timestamp` (Unix millis).
    pub fn ping(&mut self, timestamp: u64) -> bool {
        if !self.link.conn.is_connected() {
            return false;
        }

        match (NotificationCommand::Ping { timestamp }).to_text() {
            Ok(frame) => self.link.send(frame),
            Err(err) => {
                warn!(error = %err, "failed to encode ping");
                false
            },
        }
    }

    /// Register a handler for notices about chats not on screen.
    pub fn on_message<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&MessageNotificationFrame) + Send + Sync + 'static,
    {
        self.bus.subscribe(NotificationEventKind::Message, move |event| {
            if let NotificationEvent::Message(frame) = event {
                handler(frame);
            }
        })
    }

    /// Register a handler for connection status changes.
    pub fn on_connection<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ConnectionStatus) + Send + Sync + 'static,
    {
        self.bus.subscribe(NotificationEventKind::Connection, move |event| {
            if let NotificationEvent::Connection(status) = event {
                handler(status);
            }
        })
    }

    /// Register a handler for chats the user was added to.
    pub fn on_new_chat<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&NewChatNotice) + Send + Sync + 'static,
    {
        self.bus.subscribe(NotificationEventKind::NewChat, move |event| {
            if let NotificationEvent::NewChat(notice) = event {
                handler(notice);
            }
        })
    }

    /// Feed a transport event reported by the driver under `epoch`.
    pub fn handle(&mut self, epoch: Epoch, event: TransportEvent) {
        if let TransportEvent::Text(text) = &event {
            if self.link.conn.accepts_frames(epoch) {
                self.dispatch(text);
            } else {
                trace!(epoch, "dropping notification from stale socket");
            }
            return;
        }

        let statuses = self.link.handle(epoch, &event);
        self.publish_statuses(statuses);
    }

    /// The shared active-chat set.
    pub fn active_chats(&self) -> &ActiveChats {
        &self.active
    }

    /// Lifecycle state.
    pub fn state(&self) -> LinkState {
        self.link.conn.state()
    }

    /// Last status reported to connection handlers.
    pub fn status(&self) -> &ConnectionStatus {
        self.link.conn.status()
    }

    /// Whether frames can be sent.
    pub fn is_connected(&self) -> bool {
        self.link.conn.is_connected()
    }

    /// User the socket belongs to.
    pub fn user(&self) -> Option<UserId> {
        self.link.conn.target().copied()
    }

    /// Current epoch.
    pub fn epoch(&self) -> Epoch {
        self.link.conn.epoch()
    }

    /// The driver.
    pub fn driver(&self) -> &D {
        &self.link.driver
    }

    /// The driver, mutably.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.link.driver
    }

    fn dispatch(&self, text: &str) {
        let frame = match NotificationFrame::parse(text) {
            Ok(frame) => frame,
            Err(err) if err.is_unknown_type() => {
                debug!(error = %err, "ignoring notification frame");
                return;
            },
            Err(err) => {
                warn!(error = %err, "dropping malformed notification frame");
                return;
            },
        };

        match frame {
            NotificationFrame::ChatMessageNotification(frame) => {
                if self.active.is_active(frame.chat_id) {
                    debug!(chat = %frame.chat_id, "chat on screen, marking read");
                    self.active.mark_read(frame.chat_id);
                } else {
                    self.bus.publish(&NotificationEvent::Message(frame));
                }
            },
            NotificationFrame::NewChatCreated(frame) => {
                self.bus.publish(&NotificationEvent::NewChat(NewChatNotice::Created(frame)));
            },
            NotificationFrame::UserInvited(frame) => {
                self.bus.publish(&NotificationEvent::NewChat(NewChatNotice::Invited(frame)));
            },
            NotificationFrame::Pong(pong) => {
                trace!(timestamp = ?pong.timestamp, "pong");
            },
        }
    }

    fn publish_statuses(&self, statuses: Vec<ConnectionStatus>) {
        for status in statuses {
            self.bus.publish(&NotificationEvent::Connection(status));
        }
    }
}

impl<D: Driver> Disconnect for NotificationSocket<D> {
    fn disconnect(&mut self) {
        NotificationSocket::disconnect(self);
    }
}

impl<D: Driver> std::fmt::Debug for NotificationSocket<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationSocket")
            .field("user", &self.link.conn.target())
            .field("state", &self.link.conn.state())
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}
