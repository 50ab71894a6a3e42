//! Room socket frames.
//!
//! Inbound frames are parsed once with [`RoomFrame::parse`] and dispatched by
//! the room client. Outbound frames are built with [`RoomCommand`].

use serde::{Deserialize, Serialize};

use crate::{MessageId, ProtocolError, UserId, tagged};

/// Frame pushed by the server on a room socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomFrame {
    /// A message posted to the room.
    ChatMessage(ChatMessageFrame),
    /// Another member started or stopped typing.
    TypingIndicator(TypingFrame),
    /// Current presence list for the room.
    UserListUpdate(UserListFrame),
    /// Server-side failure report. The socket stays open.
    Error(ErrorFrame),
}

impl RoomFrame {
    const KNOWN: &'static [&'static str] =
        &["chat_message", "typing_indicator", "user_list_update", "error"];

    /// Parse a text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        tagged::parse_tagged(text, Self::KNOWN)
    }

    /// Wire tag of this frame.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChatMessage(_) => "chat_message",
            Self::TypingIndicator(_) => "typing_indicator",
            Self::UserListUpdate(_) => "user_list_update",
            Self::Error(_) => "error",
        }
    }
}

/// `chat_message` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageFrame {
    /// Server-assigned id, used by consumers for dedup.
    pub message_id: MessageId,
    /// Body, possibly sealed.
    pub message: MessageBody,
    /// Author's username.
    pub username: String,
    /// Author's id.
    pub user_id: UserId,
    /// Creation time as sent by the server (ISO 8601).
    #[serde(default)]
    pub timestamp: String,
}

/// Message body as carried on the wire.
///
/// The server sends either a bare string (plaintext or `iv.ciphertext`) or an
/// object wrapping the sealed form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageBody {
    /// Bare string.
    Text(String),
    /// Structured payload.
    Sealed {
        /// `base64(iv) "." base64(ciphertext)`.
        encrypted_body: String,
    },
}

impl MessageBody {
    /// The string to hand to the decrypt step.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Sealed { encrypted_body } => encrypted_body,
        }
    }
}

/// `typing_indicator` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingFrame {
    /// Who is typing.
    pub user_id: UserId,
    /// Their username.
    pub username: String,
    /// Whether they started or stopped.
    pub is_typing: bool,
}

/// `user_list_update` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserListFrame {
    /// Members currently connected to the room.
    pub users: Vec<OnlineUser>,
}

/// Presence entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineUser {
    /// User id.
    pub id: UserId,
    /// Username.
    pub username: String,
}

/// `error` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFrame {
    /// Human-readable reason.
    pub error: String,
}

/// Frame sent by the client on a room socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomCommand {
    /// Post a message.
    ChatMessage {
        /// Plaintext body. The server encrypts at rest.
        message: String,
    },
    /// Typing state change.
    Typing {
        /// Whether the local user is typing.
        is_typing: bool,
    },
}

impl RoomCommand {
    /// Encode to the JSON text frame.
    pub fn to_text(&self) -> Result<String, ProtocolError> {
        tagged::encode(self)
    }
}
