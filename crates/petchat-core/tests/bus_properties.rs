//! Property-based tests for the event bus.
//!
//! Arbitrary interleavings of subscribe, unsubscribe and publish are checked
//! against a model of which handlers are live.

use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use petchat_core::{Event, EventBus, Subscription};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Kind {
    Message,
    Typing,
    Connection,
}

struct Probe(Kind);

impl Event for Probe {
    type Kind = Kind;

    fn kind(&self) -> Kind {
        self.0
    }
}

#[derive(Debug, Clone)]
enum Op {
    Subscribe(Kind),
    Unsubscribe(usize),
    Publish(Kind),
}

fn kind() -> impl Strategy<Value = Kind> {
    prop_oneof![Just(Kind::Message), Just(Kind::Typing), Just(Kind::Connection)]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => kind().prop_map(Op::Subscribe),
        2 => any::<usize>().prop_map(Op::Unsubscribe),
        3 => kind().prop_map(Op::Publish),
    ]
}

struct Live {
    kind: Kind,
    count: Arc<AtomicUsize>,
    expected: usize,
    sub: Subscription,
}

proptest! {
    #[test]
    fn prop_only_live_handlers_receive(ops in prop::collection::vec(op_strategy(), 0..100)) {
        let bus = EventBus::new();
        let mut live: BTreeMap<usize, Live> = BTreeMap::new();
        let mut removed: Vec<(Arc<AtomicUsize>, usize)> = Vec::new();
        let mut next = 0;

        for op in ops {
            match op {
                Op::Subscribe(kind) => {
                    let count = Arc::new(AtomicUsize::new(0));
                    let inner = Arc::clone(&count);
                    let sub = bus.subscribe(kind, move |_: &Probe| {
                        inner.fetch_add(1, Ordering::SeqCst);
                    });
                    live.insert(next, Live { kind, count, expected: 0, sub });
                    next += 1;
                },
                Op::Unsubscribe(pick) => {
                    if live.is_empty() {
                        continue;
                    }
                    let key = *live.keys().nth(pick % live.len()).unwrap();
                    let entry = live.remove(&key).unwrap();
                    entry.sub.unsubscribe();
                    removed.push((entry.count, entry.expected));
                },
                Op::Publish(kind) => {
                    let mut want = 0;
                    for entry in live.values_mut().filter(|e| e.kind == kind) {
                        entry.expected += 1;
                        want += 1;
                    }
                    prop_assert_eq!(bus.publish(&Probe(kind)), want);
                },
            }
        }

        for entry in live.values() {
            prop_assert_eq!(entry.count.load(Ordering::SeqCst), entry.expected);
        }
        for (count, expected) in removed {
            prop_assert_eq!(count.load(Ordering::SeqCst), expected);
        }
    }

    #[test]
    fn prop_unsubscribed_during_dispatch_is_skipped(handlers in 2usize..8, victim in 1usize..8) {
        prop_assume!(victim < handlers);
        let bus = EventBus::new();
        let slots: Arc<parking_lot::Mutex<Vec<Option<Subscription>>>> =
            Arc::new(parking_lot::Mutex::new(Vec::new()));
        let hits: Vec<Arc<AtomicUsize>> =
            (0..handlers).map(|_| Arc::new(AtomicUsize::new(0))).collect();

        for (i, hit) in hits.iter().enumerate() {
            let hit = Arc::clone(hit);
            let slots_for_handler = Arc::clone(&slots);
            let sub = bus.subscribe(Kind::Message, move |_: &Probe| {
                hit.fetch_add(1, Ordering::SeqCst);
                // The first handler removes the victim before it runs.
                if i == 0 {
                    let taken = slots_for_handler.lock().get_mut(victim).and_then(Option::take);
                    drop(taken);
                }
            });
            slots.lock().push(Some(sub));
        }

        let delivered = bus.publish(&Probe(Kind::Message));

        prop_assert_eq!(delivered, handlers - 1);
        prop_assert_eq!(hits[victim].load(Ordering::SeqCst), 0);
    }
}
