//! Events delivered to socket handlers.

use petchat_core::{ConnectionStatus, Event};
use petchat_crypto::DecryptStatus;
use petchat_proto::{
    InvitationFrame, MessageId, MessageNotificationFrame, NewChatFrame, OnlineUser, TypingFrame,
    UserId,
};

/// Author of a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    /// User id.
    pub id: UserId,
    /// Username.
    pub username: String,
}

/// A chat message after the decrypt step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Server-assigned id. Consumers dedup on this.
    pub id: MessageId,
    /// Who sent it.
    pub author: Author,
    /// Display text.
    pub body: String,
    /// Creation time as sent by the server.
    pub timestamp: String,
    /// Whether `body` was decrypted, passed through, or failed to open.
    pub decrypt: DecryptStatus,
}

/// Events fanned out by [`crate::RoomSocket`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// A message arrived.
    Message(ChatMessage),
    /// The connection changed status.
    Connection(ConnectionStatus),
    /// A member started or stopped typing.
    Typing(TypingFrame),
    /// Presence list replaced.
    UserList(Vec<OnlineUser>),
    /// Server reported an error frame or closed with 4000.
    ServerError(String),
}

/// Kinds of [`RoomEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomEventKind {
    /// [`RoomEvent::Message`]
    Message,
    /// [`RoomEvent::Connection`]
    Connection,
    /// [`RoomEvent::Typing`]
    Typing,
    /// [`RoomEvent::UserList`]
    UserList,
    /// [`RoomEvent::ServerError`]
    ServerError,
}

impl Event for RoomEvent {
    type Kind = RoomEventKind;

    fn kind(&self) -> RoomEventKind {
        match self {
            Self::Message(_) => RoomEventKind::Message,
            Self::Connection(_) => RoomEventKind::Connection,
            Self::Typing(_) => RoomEventKind::Typing,
            Self::UserList(_) => RoomEventKind::UserList,
            Self::ServerError(_) => RoomEventKind::ServerError,
        }
    }
}

/// A chat the user was added to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewChatNotice {
    /// `new_chat_created`
    Created(NewChatFrame),
    /// `user_invited`
    Invited(InvitationFrame),
}

impl NewChatNotice {
    /// Name of the chat.
    pub fn chat_name(&self) -> &str {
        match self {
            Self::Created(frame) => &frame.chat_name,
            Self::Invited(frame) => &frame.chat_name,
        }
    }
}

/// Events fanned out by [`crate::NotificationSocket`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    /// Message in a chat that is not on screen.
    Message(MessageNotificationFrame),
    /// The connection changed status.
    Connection(ConnectionStatus),
    /// The user joined a chat.
    NewChat(NewChatNotice),
}

/// Kinds of [`NotificationEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationEventKind {
    /// [`NotificationEvent::Message`]
    Message,
    /// [`NotificationEvent::Connection`]
    Connection,
    /// [`NotificationEvent::NewChat`]
    NewChat,
}

impl Event for NotificationEvent {
    type Kind = NotificationEventKind;

    fn kind(&self) -> NotificationEventKind {
        match self {
            Self::Message(_) => NotificationEventKind::Message,
            Self::Connection(_) => NotificationEventKind::Connection,
            Self::NewChat(_) => NotificationEventKind::NewChat,
        }
    }
}
