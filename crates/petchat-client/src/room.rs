//! Room socket client.
//!
//! Keeps one connection to a chat room, sends messages and typing state, and
//! fans out what the server pushes. Frames are parsed once, decrypted where
//! needed and published on an [`EventBus`]. Nothing here returns an error to
//! the caller: transport trouble shows up as connection status events, and a
//! send while disconnected returns `false` so the caller can fall back to
//! REST.

use petchat_core::{
    Connection, ConnectionStatus, Epoch, EventBus, LinkState, Subscription, TransportEvent,
};
use petchat_crypto::{MessageKey, decrypt_message};
use petchat_proto::{
    ChatMessageFrame, CloseCode, OnlineUser, RoomCommand, RoomFrame, RoomName, TypingFrame,
};
use tracing::{debug, trace, warn};

use crate::{
    Author, ChatMessage, ClientConfig, Driver, RoomEvent, RoomEventKind,
    driver::Link,
    lifecycle::{Disconnect, Mounted},
};

/// Client for the per-room socket at `{ws_base}/chat/{room}/`.
pub struct RoomSocket<D: Driver> {
    link: Link<RoomName, D>,
    key: Option<MessageKey>,
    bus: EventBus<RoomEvent>,
}

impl<D: Driver> RoomSocket<D> {
    /// Create a disconnected client.
    ///
    /// `key` opens sealed message bodies. Without it sealed bodies are shown
    /// as-is and flagged as failed.
    pub fn new(driver: D, config: ClientConfig, key: Option<MessageKey>) -> Self {
        let conn = Connection::new(config.room_policy);
        Self { link: Link::new(conn, driver, config), key, bus: EventBus::new() }
    }

    /// Connect to `room`, closing any live connection first.
    ///
    /// Completion is observed through connection handlers.
    pub fn connect(&mut self, room: RoomName) {
        debug!(%room, "connecting room socket");
        let statuses = self.link.connect(room);
        self.publish_statuses(statuses);
    }

    /// Connect to `room` and disconnect again when the guard drops.
    pub fn mount(&mut self, room: RoomName) -> Mounted<'_, Self> {
        self.connect(room);
        Mounted::new(self)
    }

    /// Close the connection, cancel any pending reconnect and forget the
    /// room. Safe to call when already disconnected.
    pub fn disconnect(&mut self) {
        let statuses = self.link.disconnect();
        self.publish_statuses(statuses);
    }

    /// Send a chat message.
    ///
    /// Returns true if exactly one frame was handed to the transport. Returns
    /// false and sends nothing unless connected.
    pub fn send_message(&mut self, text: &str) -> bool {
        if !self.link.conn.is_connected() {
            return false;
        }

        match (RoomCommand::ChatMessage { message: text.to_string() }).to_text() {
            Ok(frame) => self.link.send(frame),
            Err(err) => {
                warn!(error = %err, "failed to encode chat message");
                false
            },
        }
    }

    /// Tell the room whether the local user is typing. Best effort.
    pub fn send_typing_indicator(&mut self, is_typing: bool) {
        if !self.link.conn.is_connected() {
            return;
        }

        match (RoomCommand::Typing { is_typing }).to_text() {
            Ok(frame) => {
                if !self.link.send(frame) {
                    trace!(is_typing, "typing indicator dropped");
                }
            },
            Err(err) => warn!(error = %err, "failed to encode typing indicator"),
        }
    }

    /// Register a handler for incoming messages.
    pub fn on_message<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ChatMessage) + Send + Sync + 'static,
    {
        self.bus.subscribe(RoomEventKind::Message, move |event| {
            if let RoomEvent::Message(message) = event {
                handler(message);
            }
        })
    }

    /// Register a handler for connection status changes.
    pub fn on_connection<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ConnectionStatus) + Send + Sync + 'static,
    {
        self.bus.subscribe(RoomEventKind::Connection, move |event| {
            if let RoomEvent::Connection(status) = event {
                handler(status);
            }
        })
    }

    /// Register a handler for typing indicators from other members.
    pub fn on_typing<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&TypingFrame) + Send + Sync + 'static,
    {
        self.bus.subscribe(RoomEventKind::Typing, move |event| {
            if let RoomEvent::Typing(typing) = event {
                handler(typing);
            }
        })
    }

    /// Register a handler for presence list updates.
    pub fn on_user_list_update<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&[OnlineUser]) + Send + Sync + 'static,
    {
        self.bus.subscribe(RoomEventKind::UserList, move |event| {
            if let RoomEvent::UserList(users) = event {
                handler(users);
            }
        })
    }

    /// Register a handler for server error frames and 4000 closes.
    pub fn on_server_error<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.bus.subscribe(RoomEventKind::ServerError, move |event| {
            if let RoomEvent::ServerError(error) = event {
                handler(error);
            }
        })
    }

    /// Feed a transport event reported by the driver under `epoch`.
    ///
    /// Events from a replaced or closed transport are dropped.
    pub fn handle(&mut self, epoch: Epoch, event: TransportEvent) {
        if let TransportEvent::Text(text) = &event {
            if self.link.conn.accepts_frames(epoch) {
                self.dispatch(text);
            } else {
                trace!(epoch, current = self.link.conn.epoch(), "dropping frame from stale socket");
            }
            return;
        }

        let current = epoch == self.link.conn.epoch();
        let statuses = self.link.handle(epoch, &event);

        let server_closed =
            matches!(&event, TransportEvent::Closed { code } if *code == CloseCode::SERVER_ERROR);
        let report_close = current && server_closed && !statuses.is_empty();

        self.publish_statuses(statuses);

        if report_close {
            warn!(room = ?self.link.conn.target(), "room socket closed by server error");
            self.bus.publish(&RoomEvent::ServerError("server closed the connection".to_string()));
        }
    }

    /// Lifecycle state.
    pub fn state(&self) -> LinkState {
        self.link.conn.state()
    }

    /// Last status reported to connection handlers.
    pub fn status(&self) -> &ConnectionStatus {
        self.link.conn.status()
    }

    /// Whether messages can be sent.
    pub fn is_connected(&self) -> bool {
        self.link.conn.is_connected()
    }

    /// Room the client is connected or connecting to.
    pub fn room(&self) -> Option<&RoomName> {
        self.link.conn.target()
    }

    /// Consecutive reconnect attempts since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.link.conn.attempts()
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

    fn dispatch(&mut self, text: &str) {
        let frame = match RoomFrame::parse(text) {
            Ok(frame) => frame,
            Err(err) if err.is_unknown_type() => {
                debug!(error = %err, "ignoring room frame");
                return;
            },
            Err(err) => {
                warn!(error = %err, "dropping malformed room frame");
                return;
            },
        };

        trace!(kind = frame.kind(), "room frame");

        let event = match frame {
            RoomFrame::ChatMessage(frame) => RoomEvent::Message(self.open_message(frame)),
            RoomFrame::TypingIndicator(frame) => RoomEvent::Typing(frame),
            RoomFrame::UserListUpdate(frame) => RoomEvent::UserList(frame.users),
            RoomFrame::Error(frame) => {
                warn!(error = %frame.error, "room socket error frame");
                RoomEvent::ServerError(frame.error)
            },
        };

        self.bus.publish(&event);
    }

    fn open_message(&self, frame: ChatMessageFrame) -> ChatMessage {
        let outcome = decrypt_message(self.key.as_ref(), frame.message.as_str());

        ChatMessage {
            id: frame.message_id,
            author: Author { id: frame.user_id, username: frame.username },
            body: outcome.text,
            timestamp: frame.timestamp,
            decrypt: outcome.status,
        }
    }

    fn publish_statuses(&self, statuses: Vec<ConnectionStatus>) {
        for status in statuses {
            self.bus.publish(&RoomEvent::Connection(status));
        }
    }
}

impl<D: Driver> Disconnect for RoomSocket<D> {
    fn disconnect(&mut self) {
        RoomSocket::disconnect(self);
    }
}

impl<D: Driver> std::fmt::Debug for RoomSocket<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomSocket")
            .field("room", &self.link.conn.target())
            .field("state", &self.link.conn.state())
            .field("epoch", &self.link.conn.epoch())
            .finish_non_exhaustive()
    }
}
