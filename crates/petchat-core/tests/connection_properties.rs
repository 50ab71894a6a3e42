//! Property-based tests for the connection state machine.
//!
//! A small driver model executes the actions the machine emits and feeds back
//! transport events, checking after every step that the machine never has
//! two transports or two timers outstanding and never exceeds its retry
//! budget.

use petchat_core::{
    Connection, ConnectionAction, ConnectionStatus, Epoch, LinkState, ReconnectPolicy,
    TransportEvent,
};
use petchat_proto::{CloseCode, RoomName};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Connect(u8),
    Disconnect,
    ServerOpen,
    ServerClose(u16),
    Fail,
    FireTimer,
    StaleEvent,
}

fn close_code() -> impl Strategy<Value = u16> {
    prop_oneof![Just(1000u16), Just(1001), Just(1006), Just(4000), Just(4001), 1000u16..5000]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => (0u8..3).prop_map(Op::Connect),
        1 => Just(Op::Disconnect),
        3 => Just(Op::ServerOpen),
        3 => close_code().prop_map(Op::ServerClose),
        1 => Just(Op::Fail),
        3 => Just(Op::FireTimer),
        1 => Just(Op::StaleEvent),
    ]
}

fn room(i: u8) -> RoomName {
    RoomName::new(format!("room-{i}")).unwrap()
}

/// Driver model: which transport and which timer exist right now.
#[derive(Default)]
struct Model {
    transport: Option<Epoch>,
    timer: Option<Epoch>,
    scheduled: usize,
    statuses: Vec<ConnectionStatus>,
}

impl Model {
    fn apply(&mut self, actions: Vec<ConnectionAction>) {
        for action in actions {
            match action {
                ConnectionAction::Open { epoch, .. } => {
                    assert!(self.transport.is_none(), "second transport opened");
                    self.transport = Some(epoch);
                },
                ConnectionAction::Close { epoch, code, .. } => {
                    assert_eq!(self.transport, Some(epoch));
                    assert_eq!(code, CloseCode::NORMAL);
                    self.transport = None;
                },
                ConnectionAction::ScheduleReconnect { epoch, .. } => {
                    assert!(self.timer.is_none(), "second timer scheduled");
                    self.timer = Some(epoch);
                    self.scheduled += 1;
                },
                ConnectionAction::CancelReconnect { epoch } => {
                    assert_eq!(self.timer, Some(epoch));
                    self.timer = None;
                },
                ConnectionAction::Status(status) => self.statuses.push(status),
            }
        }
    }
}

fn step(conn: &mut Connection<RoomName>, model: &mut Model, op: &Op) {
    let actions = match op {
        Op::Connect(i) => conn.connect(room(*i)),
        Op::Disconnect => conn.disconnect(),
        Op::ServerOpen => match model.transport {
            Some(epoch) if conn.state() == LinkState::Connecting => {
                conn.handle(epoch, &TransportEvent::Opened)
            },
            _ => Vec::new(),
        },
        Op::ServerClose(code) => match model.transport.take() {
            Some(epoch) => conn.handle(epoch, &TransportEvent::Closed { code: CloseCode(*code) }),
            None => Vec::new(),
        },
        Op::Fail => match model.transport.take() {
            Some(epoch) => {
                let mut actions =
                    conn.handle(epoch, &TransportEvent::Failed { reason: "reset".into() });
                actions.extend(
                    conn.handle(epoch, &TransportEvent::Closed { code: CloseCode::ABNORMAL }),
                );
                actions
            },
            None => Vec::new(),
        },
        Op::FireTimer => match model.timer.take() {
            Some(epoch) => conn.handle(epoch, &TransportEvent::ReconnectDue),
            None => Vec::new(),
        },
        Op::StaleEvent => {
            let stale = conn.epoch().saturating_sub(1);
            if stale == conn.epoch() {
                Vec::new()
            } else {
                let before = conn.state();
                let mut actions = conn.handle(stale, &TransportEvent::Opened);
                actions.extend(conn.handle(stale, &TransportEvent::ReconnectDue));
                actions.extend(
                    conn.handle(stale, &TransportEvent::Closed { code: CloseCode::ABNORMAL }),
                );
                assert!(actions.is_empty(), "stale epoch produced actions");
                assert_eq!(conn.state(), before);
                actions
            }
        },
    };

    model.apply(actions);
}

proptest! {
    #[test]
    fn prop_single_transport_and_bounded_attempts(
        ops in prop::collection::vec(op_strategy(), 0..80),
    ) {
        let policy = ReconnectPolicy::default();
        let mut conn = Connection::new(policy);
        let mut model = Model::default();

        for op in &ops {
            step(&mut conn, &mut model, op);

            prop_assert!(conn.attempts() <= policy.max_attempts);
            prop_assert_eq!(conn.reconnect_pending(), model.timer.is_some());
            if conn.is_connected() {
                prop_assert_eq!(conn.attempts(), 0);
                prop_assert_eq!(model.transport, Some(conn.epoch()));
            }
        }
    }

    #[test]
    fn prop_retries_stop_after_max_consecutive_failures(extra in 0usize..10) {
        let policy = ReconnectPolicy::default();
        let mut conn = Connection::new(policy);
        let mut model = Model::default();
        model.apply(conn.connect(room(0)));

        for _ in 0..(policy.max_attempts as usize + 1 + extra) {
            step(&mut conn, &mut model, &Op::ServerClose(1006));
            step(&mut conn, &mut model, &Op::FireTimer);
        }

        prop_assert_eq!(model.scheduled, policy.max_attempts as usize);
        prop_assert_eq!(conn.state(), LinkState::Disconnected);
        prop_assert!(model.transport.is_none());
    }

    #[test]
    fn prop_successful_open_resets_counter(failures in 1u32..5) {
        let mut conn = Connection::new(ReconnectPolicy::default());
        let mut model = Model::default();
        model.apply(conn.connect(room(0)));

        for _ in 0..failures {
            step(&mut conn, &mut model, &Op::ServerClose(1006));
            step(&mut conn, &mut model, &Op::FireTimer);
        }
        prop_assert_eq!(conn.attempts(), failures);

        step(&mut conn, &mut model, &Op::ServerOpen);
        prop_assert_eq!(conn.attempts(), 0);
        prop_assert!(conn.is_connected());
    }

    #[test]
    fn prop_auth_failure_never_reconnects(failures in 0u32..5) {
        let mut conn = Connection::new(ReconnectPolicy::default());
        let mut model = Model::default();
        model.apply(conn.connect(room(0)));

        for _ in 0..failures {
            step(&mut conn, &mut model, &Op::ServerClose(1006));
            step(&mut conn, &mut model, &Op::FireTimer);
        }
        let scheduled = model.scheduled;

        step(&mut conn, &mut model, &Op::ServerClose(4001));

        prop_assert_eq!(model.scheduled, scheduled);
        prop_assert!(model.timer.is_none());
        prop_assert_eq!(conn.status(), &ConnectionStatus::AuthError);
        prop_assert_eq!(model.statuses.last(), Some(&ConnectionStatus::AuthError));
    }

    #[test]
    fn prop_replaced_connection_is_isolated(a in 0u8..3, b in 0u8..3, open_first in any::<bool>()) {
        prop_assume!(a != b);
        let mut conn = Connection::new(ReconnectPolicy::default());
        let mut model = Model::default();

        model.apply(conn.connect(room(a)));
        let old = conn.epoch();
        if open_first {
            step(&mut conn, &mut model, &Op::ServerOpen);
        }

        model.apply(conn.connect(room(b)));

        prop_assert_eq!(conn.target(), Some(&room(b)));
        prop_assert_eq!(model.transport, Some(conn.epoch()));
        prop_assert!(!conn.accepts_frames(old));
        prop_assert!(conn.handle(old, &TransportEvent::Opened).is_empty());
        let closed = TransportEvent::Closed { code: CloseCode::ABNORMAL };
        prop_assert!(conn.handle(old, &closed).is_empty());
    }
}
