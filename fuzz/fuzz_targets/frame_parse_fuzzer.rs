//! Fuzz target for inbound frame parsing.
//!
//! # Strategy
//!
//! - Raw text: arbitrary UTF-8 through both socket parsers
//! - Tagged objects: a known or unknown `type` with arbitrary fields
//!
//! # Invariants
//!
//! - Parsing never panics
//! - A parsed frame carries one of the tags its socket knows
//! - An unknown tag is reported as unknown, never as a frame

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use petchat_proto::{NotificationFrame, ProtocolError, RoomFrame};

const ROOM_TAGS: &[&str] = &["chat_message", "typing_indicator", "user_list_update", "error"];

const NOTIFICATION_TAGS: &[&str] =
    &["new_chat_created", "chat_message_notification", "user_invited", "pong"];

const TAGS: &[&str] = &[
    "chat_message",
    "typing_indicator",
    "user_list_update",
    "error",
    "new_chat_created",
    "chat_message_notification",
    "user_invited",
    "pong",
    "ping",
    "typing",
];

#[derive(Debug, Arbitrary)]
enum Input {
    Raw(String),
    Tagged { tag: u8, fields: Vec<(String, Field)> },
}

#[derive(Debug, Arbitrary)]
enum Field {
    Number(u64),
    Text(String),
    Flag(bool),
    Null,
    List(Vec<u64>),
}

impl Field {
    fn render(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => format!("{s:?}"),
            Self::Flag(b) => b.to_string(),
            Self::Null => "null".to_string(),
            Self::List(items) => {
                let items: Vec<String> = items.iter().map(u64::to_string).collect();
                format!("[{}]", items.join(","))
            },
        }
    }
}

fn render(input: &Input) -> String {
    match input {
        Input::Raw(text) => text.clone(),
        Input::Tagged { tag, fields } => {
            let tag = TAGS[usize::from(*tag) % TAGS.len()];
            let mut body = format!("{{\"type\":\"{tag}\"");
            for (name, value) in fields {
                body.push_str(&format!(",{name:?}:{}", value.render()));
            }
            body.push('}');
            body
        },
    }
}

fuzz_target!(|input: Input| {
    let text = render(&input);

    match RoomFrame::parse(&text) {
        Ok(frame) => assert!(ROOM_TAGS.contains(&frame.kind())),
        Err(ProtocolError::UnknownType(tag)) => assert!(!ROOM_TAGS.contains(&tag.as_str())),
        Err(_) => {},
    }

    match NotificationFrame::parse(&text) {
        Ok(frame) => assert!(NOTIFICATION_TAGS.contains(&frame.kind())),
        Err(ProtocolError::UnknownType(tag)) => {
            assert!(!NOTIFICATION_TAGS.contains(&tag.as_str()));
        },
        Err(_) => {},
    }
});
