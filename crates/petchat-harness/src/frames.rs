//! Builders for frames the server pushes.

use petchat_proto::{ChatId, MessageId, UserId};
use serde_json::json;

/// `chat_message` frame with a plain or sealed string body.
pub fn chat_message(id: MessageId, user: UserId, username: &str, body: &str) -> String {
    json!({
        "type": "chat_message",
        "message_id": id,
        "message": body,
        "username": username,
        "user_id": user,
        "timestamp": "2025-01-01T12:00:00Z",
    })
    .to_string()
}

/// `chat_message` frame with a `{"encrypted_body": ..}` body.
pub fn sealed_chat_message(id: MessageId, user: UserId, username: &str, sealed: &str) -> String {
    json!({
        "type": "chat_message",
        "message_id": id,
        "message": { "encrypted_body": sealed },
        "username": username,
        "user_id": user,
        "timestamp": "2025-01-01T12:00:00Z",
    })
    .to_string()
}

/// `typing_indicator` frame.
pub fn typing(user: UserId, username: &str, is_typing: bool) -> String {
    json!({
        "type": "typing_indicator",
        "user_id": user,
        "username": username,
        "is_typing": is_typing,
    })
    .to_string()
}

/// `user_list_update` frame.
pub fn user_list(users: &[(UserId, &str)]) -> String {
    let users: Vec<_> =
        users.iter().map(|(id, name)| json!({ "id": id, "username": name })).collect();
    json!({ "type": "user_list_update", "users": users }).to_string()
}

/// Room `error` frame.
pub fn room_error(error: &str) -> String {
    json!({ "type": "error", "error": error }).to_string()
}

/// `chat_message_notification` frame.
pub fn message_notification(chat: ChatId, chat_name: &str, preview: &str) -> String {
    json!({
        "type": "chat_message_notification",
        "chat_id": chat,
        "chat_name": chat_name,
        "is_private": false,
        "message": preview,
        "author": { "id": 7, "username": "biscuit" },
        "timestamp": "2025-01-01T12:00:00Z",
    })
    .to_string()
}

/// `new_chat_created` frame.
pub fn new_chat(chat: ChatId, chat_name: &str) -> String {
    json!({
        "type": "new_chat_created",
        "chat_id": chat,
        "chat_name": chat_name,
        "is_private": true,
        "created_by": { "id": 7, "username": "biscuit" },
        "members": [1, 7],
    })
    .to_string()
}

/// `user_invited` frame.
pub fn invited(chat: ChatId, chat_name: &str) -> String {
    json!({
        "type": "user_invited",
        "chat_id": chat,
        "chat_name": chat_name,
        "is_private": false,
        "invited_by": { "id": 7, "username": "biscuit" },
    })
    .to_string()
}

/// `pong` frame.
pub fn pong(timestamp: u64) -> String {
    json!({ "type": "pong", "timestamp": timestamp }).to_string()
}
