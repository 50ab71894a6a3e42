//! Identifiers shared by both sockets.
//!
//! Chat, user and message ids are backend primary keys serialized as bare
//! JSON numbers. Room names are the URL slug of the room socket route and are
//! validated against the backend route pattern before a socket is opened.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Backend id of a chat group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub u64);

/// Backend id of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Backend id of a chat message. Ids grow monotonically with send order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

macro_rules! display_inner {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        })*
    };
}

display_inner!(ChatId, UserId, MessageId);

/// Name of a chat room as it appears in the room socket path.
///
/// Accepts one or more characters from `[A-Za-z0-9_-]` plus any other Unicode
/// alphanumerics, which is what the backend router's `[\w-]+` matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RoomName(String);

impl RoomName {
    /// Validate and wrap a room name.
    pub fn new(name: impl Into<String>) -> Result<Self, ProtocolError> {
        let name = name.into();
        let valid = !name.is_empty()
            && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-');

        if valid { Ok(Self(name)) } else { Err(ProtocolError::InvalidRoomName(name)) }
    }

    /// The validated name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RoomName {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for RoomName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}
