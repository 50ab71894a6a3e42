//! Consumer-side message list fed by the room socket and REST history.

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use parking_lot::Mutex;
use petchat_client::{
    Author, ChatMessage, ClientConfig, Conversation, RoomSocket, TypingDebouncer,
};
use petchat_core::{Environment, TransportEvent};
use petchat_crypto::DecryptStatus;
use petchat_harness::{SimDriver, SimEnv, frames};
use petchat_proto::{MessageId, RoomName, UserId};
use proptest::prelude::*;

fn message(id: u64) -> ChatMessage {
    ChatMessage {
        id: MessageId(id),
        author: Author { id: UserId(1), username: "rex".to_string() },
        body: format!("message {id}"),
        timestamp: String::new(),
        decrypt: DecryptStatus::Plaintext,
    }
}

#[test]
fn echo_of_optimistic_append_is_ignored() {
    let mut conversation = Conversation::new();
    let driver = SimDriver::new();
    let mut socket = RoomSocket::new(driver, ClientConfig::default(), None);

    let inbox = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&inbox);
    let _sub = socket.on_message(move |m| sink.lock().push(m.clone()));

    socket.connect(RoomName::new("lobby").unwrap());
    let epoch = socket.epoch();
    socket.handle(epoch, TransportEvent::Opened);

    // Sent over REST while the socket was down, then echoed by the server.
    assert!(conversation.push(message(10)));
    socket.handle(
        epoch,
        TransportEvent::Text(frames::chat_message(MessageId(10), UserId(1), "rex", "message 10")),
    );
    socket.handle(
        epoch,
        TransportEvent::Text(frames::chat_message(MessageId(11), UserId(2), "luna", "hi")),
    );

    for m in inbox.lock().drain(..) {
        conversation.push(m);
    }

    let ids: Vec<_> = conversation.messages().iter().map(|m| m.id.0).collect();
    assert_eq!(ids, vec![10, 11]);
}

#[test]
fn history_merge_fills_gaps_in_order() {
    let mut conversation = Conversation::new();
    conversation.push(message(5));
    conversation.push(message(9));

    let added = conversation.merge_history([message(8), message(6), message(5), message(7)]);

    assert_eq!(added, 3);
    let ids: Vec<_> = conversation.messages().iter().map(|m| m.id.0).collect();
    assert_eq!(ids, vec![5, 6, 7, 8, 9]);
    assert_eq!(conversation.oldest_id(), Some(MessageId(5)));
}

#[test]
fn typing_debouncer_runs_on_the_virtual_clock() {
    let env = SimEnv::new();
    let mut typing = TypingDebouncer::default();

    assert_eq!(typing.input(env.now(), "w"), Some(true));
    env.advance(Duration::from_millis(600));
    assert_eq!(typing.input(env.now(), "wo"), None);
    env.advance(Duration::from_millis(600));
    assert_eq!(typing.tick(env.now()), None);
    env.advance(Duration::from_millis(400));
    assert_eq!(typing.tick(env.now()), Some(false));
}

proptest! {
    #[test]
    fn one_copy_per_id(ids in prop::collection::vec(0u64..20, 0..60), split in 0usize..60) {
        let split = split.min(ids.len());
        let mut conversation = Conversation::new();

        for id in &ids[..split] {
            conversation.push(message(*id));
        }
        conversation.merge_history(ids[split..].iter().map(|id| message(*id)));

        let unique: BTreeSet<_> = ids.iter().copied().collect();
        prop_assert_eq!(conversation.len(), unique.len());
        for id in unique {
            prop_assert!(conversation.contains(MessageId(id)));
        }
    }
}
