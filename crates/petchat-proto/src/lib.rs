//! Petchat Protocol
//!
//! JSON text frames exchanged over the two realtime sockets of the Pet Society
//! chat front end:
//!
//! - The room socket (`/ws/chat/{room}/`) carries chat messages, typing
//!   indicators, presence lists and server errors for one room.
//! - The notification socket (`/ws/notifications/{user_id}/`) carries
//!   cross-room notices for a single authenticated user.
//!
//! Every frame is a JSON object with a `type` discriminant drawn from a fixed
//! set. Parsing distinguishes frames that are not JSON objects at all
//! ([`ProtocolError::Malformed`]) from well-formed frames with a tag this
//! client does not know ([`ProtocolError::UnknownType`]) so callers can log
//! the two differently.
//!
//! Close codes are modelled by [`CloseCode`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod close;
pub mod errors;
pub mod ids;
pub mod notification;
pub mod room;

mod tagged;

pub use close::{CloseCode, CloseKind};
pub use errors::ProtocolError;
pub use ids::{ChatId, MessageId, RoomName, UserId};
pub use notification::{
    InvitationFrame, MessageNotificationFrame, NewChatFrame, NotificationCommand,
    NotificationFrame, PongFrame, UserSummary,
};
pub use room::{
    ChatMessageFrame, ErrorFrame, MessageBody, OnlineUser, RoomCommand, RoomFrame, TypingFrame,
    UserListFrame,
};
