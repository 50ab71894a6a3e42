//! Petchat Client
//!
//! Socket clients for the Pet Society realtime chat.
//!
//! - [`RoomSocket`]: one connection to a chat room. Sends messages and typing
//!   state, and fans out messages, typing, presence and status to handlers.
//! - [`NotificationSocket`]: one connection per user for cross-room notices.
//!   Notices for chats in the [`ActiveChats`] set are turned into read
//!   receipts instead of being shown.
//! - [`ActiveChats`]: the persisted set of chats currently on screen, shared
//!   by both sockets.
//!
//! Both sockets are synchronous state machines over a [`Driver`]. The owner
//! feeds transport events back with `handle(epoch, event)`; with the
//! `transport` feature, [`transport::WsDriver`] does the I/O on tokio and
//! delivers those events over a channel.
//!
//! Supporting pieces:
//!
//! - [`Conversation`]: message list with dedup by id, for consumers.
//! - [`TypingDebouncer`]: turns keystrokes into typing start/stop frames.
//! - [`Mounted`]: scope guard that disconnects a socket on drop.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod active_chats;
pub mod config;
pub mod conversation;
pub mod driver;
pub mod event;
pub mod lifecycle;
pub mod notification;
pub mod room;
pub mod store;
pub mod typing;

#[cfg(feature = "transport")]
pub mod transport;

pub use active_chats::{ACTIVE_CHATS_KEY, ActiveChats, ReadReceipts};
pub use config::ClientConfig;
pub use conversation::Conversation;
pub use driver::Driver;
pub use event::{
    Author, ChatMessage, NewChatNotice, NotificationEvent, NotificationEventKind, RoomEvent,
    RoomEventKind,
};
pub use lifecycle::{Disconnect, Mounted};
pub use notification::NotificationSocket;
pub use room::RoomSocket;
pub use store::{ChatStore, MemoryStore, RedbStore, StoreError};
pub use typing::{TypingConfig, TypingDebouncer};
