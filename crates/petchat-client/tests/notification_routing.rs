//! Notification socket routing against the active-chat set.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use petchat_client::{ActiveChats, ClientConfig, MemoryStore, NewChatNotice, NotificationSocket};
use petchat_core::{ConnectionStatus, LinkState, TransportEvent};
use petchat_harness::{RecordingReceipts, SimDriver, frames};
use petchat_proto::{ChatId, CloseCode, MessageNotificationFrame, UserId};

struct Fixture {
    socket: NotificationSocket<SimDriver>,
    driver: SimDriver,
    receipts: RecordingReceipts,
    active: ActiveChats,
}

fn fixture() -> Fixture {
    let driver = SimDriver::new();
    let receipts = RecordingReceipts::new();
    let active = ActiveChats::load(MemoryStore::new(), Arc::new(receipts.clone())).unwrap();
    let socket = NotificationSocket::new(driver.clone(), ClientConfig::default(), active.clone());
    Fixture { socket, driver, receipts, active }
}

fn connected(user: u64) -> Fixture {
    let mut fx = fixture();
    fx.socket.connect(UserId(user));
    let epoch = fx.socket.epoch();
    fx.socket.handle(epoch, TransportEvent::Opened);
    fx
}

fn push(fx: &mut Fixture, text: String) {
    let epoch = fx.socket.epoch();
    fx.socket.handle(epoch, TransportEvent::Text(text));
}

fn notices(socket: &NotificationSocket<SimDriver>) -> Arc<Mutex<Vec<MessageNotificationFrame>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    socket.on_message(move |frame| sink.lock().push(frame.clone())).forget();
    seen
}

#[test]
fn connect_opens_user_endpoint() {
    let fx = connected(42);

    assert_eq!(
        fx.driver.opened_urls(),
        vec!["ws://localhost:8000/ws/notifications/42/".to_string()]
    );
    assert!(fx.socket.is_connected());
    assert_eq!(fx.socket.user(), Some(UserId(42)));
}

#[test]
fn notice_for_inactive_chat_is_forwarded() {
    let mut fx = connected(1);
    let seen = notices(&fx.socket);

    push(&mut fx, frames::message_notification(ChatId(9), "Cats", "meow"));

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].chat_id, ChatId(9));
    assert_eq!(seen[0].message, "meow");
    assert!(fx.receipts.requests().is_empty());
}

#[test]
fn notice_for_active_chat_becomes_one_read_receipt() {
    let mut fx = connected(1);
    let seen = notices(&fx.socket);

    fx.active.mark_active(ChatId(9)).unwrap();
    fx.receipts.take();

    push(&mut fx, frames::message_notification(ChatId(9), "Cats", "meow"));

    assert!(seen.lock().is_empty());
    assert_eq!(fx.receipts.requests(), vec![ChatId(9)]);
}

#[test]
fn leaving_a_chat_restores_notices() {
    let mut fx = connected(1);
    let seen = notices(&fx.socket);

    fx.active.mark_active(ChatId(3)).unwrap();
    fx.active.mark_inactive(ChatId(3)).unwrap();
    fx.receipts.take();

    push(&mut fx, frames::message_notification(ChatId(3), "Dogs", "woof"));

    assert_eq!(seen.lock().len(), 1);
    assert!(fx.receipts.requests().is_empty());
}

#[test]
fn new_chat_and_invitation_reach_new_chat_handlers() {
    let mut fx = connected(1);
    let names = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&names);
    let _sub = fx.socket.on_new_chat(move |notice| {
        let kind = match notice {
            NewChatNotice::Created(_) => "created",
            NewChatNotice::Invited(_) => "invited",
        };
        sink.lock().push((kind, notice.chat_name().to_string()));
    });

    push(&mut fx, frames::new_chat(ChatId(4), "Birds"));
    push(&mut fx, frames::invited(ChatId(5), "Fish"));

    assert_eq!(
        *names.lock(),
        vec![("created", "Birds".to_string()), ("invited", "Fish".to_string())]
    );
}

#[test]
fn pong_and_unknown_frames_are_consumed_silently() {
    let mut fx = connected(1);
    let seen = notices(&fx.socket);

    push(&mut fx, frames::pong(1_700_000_000_000));
    push(&mut fx, r#"{"type":"friend_request","from":3}"#.to_string());
    push(&mut fx, "{".to_string());

    assert!(seen.lock().is_empty());
    assert!(fx.socket.is_connected());
}

#[test]
fn connect_for_same_user_is_a_no_op() {
    let mut fx = connected(1);
    let calls = fx.driver.take_calls();
    assert_eq!(calls.len(), 1);

    fx.socket.connect(UserId(1));
    assert!(fx.driver.take_calls().is_empty());

    fx.socket.connect(UserId(2));
    assert_eq!(fx.driver.open_transports().len(), 1);
    assert_eq!(fx.socket.user(), Some(UserId(2)));
    assert_eq!(fx.socket.state(), LinkState::Connecting);
}

#[test]
fn ping_and_send_require_connection() {
    let mut fx = fixture();
    assert!(!fx.socket.ping(1));
    assert!(!fx.socket.send(&serde_json::json!({ "type": "hello" })));

    fx.socket.connect(UserId(1));
    let epoch = fx.socket.epoch();
    fx.socket.handle(epoch, TransportEvent::Opened);

    assert!(fx.socket.ping(1_700_000_000_000));
    assert!(fx.socket.send(&serde_json::json!({ "type": "hello" })));
    assert_eq!(
        fx.driver.sent_frames(),
        vec![
            r#"{"type":"ping","timestamp":1700000000000}"#.to_string(),
            r#"{"type":"hello"}"#.to_string(),
        ]
    );
}

#[test]
fn reconnects_every_second_on_abnormal_close() {
    let mut fx = connected(1);
    let epoch = fx.socket.epoch();

    fx.socket.handle(epoch, TransportEvent::Closed { code: CloseCode::GOING_AWAY });
    assert_eq!(fx.driver.pending_timers(), vec![(epoch, Duration::from_secs(1))]);

    let due = fx.driver.fire_timer().unwrap();
    fx.socket.handle(due, TransportEvent::ReconnectDue);
    assert_eq!(fx.driver.opened_urls().len(), 2);
    assert_eq!(fx.socket.user(), Some(UserId(1)));
}

#[test]
fn auth_failure_is_never_retried() {
    let mut fx = connected(1);
    let statuses = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&statuses);
    let _sub = fx.socket.on_connection(move |status| sink.lock().push(status.clone()));

    let epoch = fx.socket.epoch();
    fx.socket.handle(epoch, TransportEvent::Closed { code: CloseCode::AUTH_FAILED });

    assert_eq!(*statuses.lock(), vec![ConnectionStatus::Disconnected, ConnectionStatus::AuthError]);
    assert!(fx.driver.pending_timers().is_empty());
}

#[test]
fn frames_after_disconnect_are_dropped() {
    let mut fx = connected(1);
    let seen = notices(&fx.socket);
    let epoch = fx.socket.epoch();

    fx.socket.disconnect();
    fx.socket.handle(
        epoch,
        TransportEvent::Text(frames::message_notification(ChatId(1), "x", "y")),
    );

    assert!(seen.lock().is_empty());
    assert!(fx.socket.user().is_none());
}
