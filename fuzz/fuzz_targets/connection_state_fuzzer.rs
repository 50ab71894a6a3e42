//! Fuzz target for the connection state machine.
//!
//! # Strategy
//!
//! - Arbitrary interleavings of client calls, transport events and timer
//!   firings, including events tagged with stale epochs
//!
//! # Invariants
//!
//! - At most one transport and one reconnect timer outstanding
//! - Attempts never exceed the policy maximum
//! - Stale events produce no actions
//! - Never panics

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use petchat_core::{Connection, ConnectionAction, Epoch, ReconnectPolicy, TransportEvent};
use petchat_proto::{CloseCode, UserId};

#[derive(Debug, Arbitrary)]
enum Op {
    Connect(u8),
    Disconnect,
    Open,
    Close(u16),
    Fail,
    FireTimer,
    Stale(u8),
}

#[derive(Default)]
struct Driver {
    transport: Option<Epoch>,
    timer: Option<Epoch>,
}

impl Driver {
    fn apply(&mut self, actions: Vec<ConnectionAction>) {
        for action in actions {
            match action {
                ConnectionAction::Open { epoch, .. } => {
                    assert!(self.transport.is_none());
                    self.transport = Some(epoch);
                },
                ConnectionAction::Close { epoch, .. } => {
                    assert_eq!(self.transport.take(), Some(epoch));
                },
                ConnectionAction::ScheduleReconnect { epoch, .. } => {
                    assert!(self.timer.is_none());
                    self.timer = Some(epoch);
                },
                ConnectionAction::CancelReconnect { epoch } => {
                    assert_eq!(self.timer.take(), Some(epoch));
                },
                ConnectionAction::Status(_) => {},
            }
        }
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let policy = ReconnectPolicy::notifications();
    let mut conn: Connection<UserId> = Connection::new(policy);
    let mut driver = Driver::default();

    for op in ops {
        let actions = match op {
            Op::Connect(user) => conn.connect(UserId(u64::from(user % 3))),
            Op::Disconnect => conn.disconnect(),
            Op::Open => match driver.transport {
                Some(epoch) => conn.handle(epoch, &TransportEvent::Opened),
                None => Vec::new(),
            },
            Op::Close(code) => match driver.transport.take() {
                Some(epoch) => {
                    conn.handle(epoch, &TransportEvent::Closed { code: CloseCode(code) })
                },
                None => Vec::new(),
            },
            Op::Fail => match driver.transport {
                Some(epoch) => {
                    conn.handle(epoch, &TransportEvent::Failed { reason: "fuzz".into() })
                },
                None => Vec::new(),
            },
            Op::FireTimer => match driver.timer.take() {
                Some(epoch) => conn.handle(epoch, &TransportEvent::ReconnectDue),
                None => Vec::new(),
            },
            Op::Stale(back) => match conn.epoch().checked_sub(u64::from(back) + 1) {
                Some(epoch) => {
                    let closed = TransportEvent::Closed { code: CloseCode::ABNORMAL };
                    assert!(conn.handle(epoch, &closed).is_empty());
                    assert!(conn.handle(epoch, &TransportEvent::ReconnectDue).is_empty());
                    Vec::new()
                },
                None => Vec::new(),
            },
        };

        driver.apply(actions);
        assert!(conn.attempts() <= policy.max_attempts);
    }
});
