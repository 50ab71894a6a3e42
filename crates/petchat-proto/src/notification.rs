//! Notification socket frames.
//!
//! One socket per authenticated user delivers notices about chats other than
//! the one on screen. The client may send `ping` and the server answers with
//! `pong`.

use serde::{Deserialize, Serialize};

use crate::{ChatId, ProtocolError, UserId, tagged};

/// Frame pushed by the server on the notification socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationFrame {
    /// The user was made a member of a newly created chat.
    NewChatCreated(NewChatFrame),
    /// A message was posted to one of the user's chats.
    ChatMessageNotification(MessageNotificationFrame),
    /// Another member invited the user into an existing chat.
    UserInvited(InvitationFrame),
    /// Keepalive reply.
    Pong(PongFrame),
}

impl NotificationFrame {
    const KNOWN: &'static [&'static str] =
        &["new_chat_created", "chat_message_notification", "user_invited", "pong"];

    /// Parse a text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        tagged::parse_tagged(text, Self::KNOWN)
    }

    /// Wire tag of this frame.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewChatCreated(_) => "new_chat_created",
            Self::ChatMessageNotification(_) => "chat_message_notification",
            Self::UserInvited(_) => "user_invited",
            Self::Pong(_) => "pong",
        }
    }
}

/// Public profile fields attached to notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// User id.
    pub id: UserId,
    /// Username.
    pub username: String,
    /// Given name, may be empty.
    #[serde(default)]
    pub first_name: String,
    /// Family name, may be empty.
    #[serde(default)]
    pub last_name: String,
}

/// `new_chat_created` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewChatFrame {
    /// The new chat.
    pub chat_id: ChatId,
    /// Display name.
    pub chat_name: String,
    /// Whether the chat is a 1:1 conversation.
    #[serde(default)]
    pub is_private: bool,
    /// Creator, when known.
    #[serde(default)]
    pub created_by: Option<UserSummary>,
    /// Member ids.
    #[serde(default)]
    pub members: Vec<UserId>,
}

/// `chat_message_notification` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageNotificationFrame {
    /// Chat the message was posted to.
    pub chat_id: ChatId,
    /// Display name.
    #[serde(default)]
    pub chat_name: String,
    /// Whether the chat is a 1:1 conversation.
    #[serde(default)]
    pub is_private: bool,
    /// Message preview. May be sealed.
    #[serde(default)]
    pub message: String,
    /// Author, when known.
    #[serde(default)]
    pub author: Option<UserSummary>,
    /// Creation time as sent by the server.
    #[serde(default)]
    pub timestamp: String,
}

/// `user_invited` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationFrame {
    /// Chat the user was added to.
    pub chat_id: ChatId,
    /// Display name.
    pub chat_name: String,
    /// Whether the chat is a 1:1 conversation.
    #[serde(default)]
    pub is_private: bool,
    /// Inviter, when known.
    #[serde(default)]
    pub invited_by: Option<UserSummary>,
}

/// `pong` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PongFrame {
    /// Echo of the ping timestamp.
    #[serde(default)]
    pub timestamp: Option<u64>,
}

/// Frame sent by the client on the notification socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationCommand {
    /// Keepalive.
    Ping {
        /// Milliseconds since the Unix epoch, echoed back in `pong`.
        timestamp: u64,
    },
}

impl NotificationCommand {
    /// Encode to the JSON text frame.
    pub fn to_text(&self) -> Result<String, ProtocolError> {
        tagged::encode(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_message_notification() {
        let text = r#"{"type":"chat_message_notification","chat_id":9,"chat_name":"Cats","is_private":false,"message":"meow","author":{"id":4,"username":"tom","first_name":"Tom","last_name":""},"timestamp":"t"}"#;

        let NotificationFrame::ChatMessageNotification(frame) =
            NotificationFrame::parse(text).unwrap()
        else {
            panic!("expected chat_message_notification");
        };
        assert_eq!(frame.chat_id, ChatId(9));
        assert_eq!(frame.author.unwrap().username, "tom");
    }

    #[test]
    fn parse_new_chat_and_invite() {
        let created = r#"{"type":"new_chat_created","chat_id":1,"chat_name":"Dogs","is_private":true,"created_by":{"id":2,"username":"rex"},"members":[2,5]}"#;
        let NotificationFrame::NewChatCreated(frame) = NotificationFrame::parse(created).unwrap()
        else {
            panic!("expected new_chat_created");
        };
        assert_eq!(frame.members, vec![UserId(2), UserId(5)]);
        assert_eq!(frame.created_by.unwrap().first_name, "");

        let invited = r#"{"type":"user_invited","chat_id":3,"chat_name":"Birds","is_private":false,"invited_by":null}"#;
        let frame = NotificationFrame::parse(invited).unwrap();
        assert_eq!(frame.kind(), "user_invited");
    }

    #[test]
    fn room_only_tags_are_unknown_here() {
        let text = r#"{"type":"typing_indicator","user_id":1,"username":"a","is_typing":true}"#;
        assert!(NotificationFrame::parse(text).unwrap_err().is_unknown_type());
    }

    #[test]
    fn ping_encodes_with_timestamp() {
        let text = NotificationCommand::Ping { timestamp: 1_700_000_000_000 }.to_text().unwrap();
        assert_eq!(text, r#"{"type":"ping","timestamp":1700000000000}"#);
    }
}
