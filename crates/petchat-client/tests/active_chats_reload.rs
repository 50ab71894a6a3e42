//! The active-chat set survives a reload.
//!
//! A "reload" drops every handle and loads the set again from the same
//! store, as a restarted process would. Two sets loaded from one store stand
//! in for a room session and a notification watcher in separate processes.

use std::{collections::BTreeSet, sync::Arc};

use petchat_client::{ACTIVE_CHATS_KEY, ActiveChats, ChatStore, MemoryStore, RedbStore};
use petchat_harness::RecordingReceipts;
use petchat_proto::ChatId;
use proptest::prelude::*;

fn load(store: impl ChatStore) -> (ActiveChats, RecordingReceipts) {
    let receipts = RecordingReceipts::new();
    let active = ActiveChats::load(store, Arc::new(receipts.clone())).unwrap();
    (active, receipts)
}

#[test]
fn mark_active_requests_a_receipt_each_time() {
    let (active, receipts) = load(MemoryStore::new());

    active.mark_active(ChatId(1)).unwrap();
    active.mark_active(ChatId(1)).unwrap();

    assert_eq!(receipts.count_for(ChatId(1)), 2);
    assert_eq!(active.snapshot(), vec![ChatId(1)]);
}

#[test]
fn persisted_value_is_a_json_array_of_ids() {
    let store = MemoryStore::new();
    let (active, _) = load(store.clone());

    active.mark_active(ChatId(3)).unwrap();
    active.mark_active(ChatId(1)).unwrap();

    let raw = store.load(ACTIVE_CHATS_KEY).unwrap().unwrap();
    let ids: Vec<u64> = serde_json::from_str(&raw).unwrap();
    assert_eq!(ids, vec![1, 3]);
}

#[test]
fn memory_store_reload() {
    let store = MemoryStore::new();
    {
        let (active, _) = load(store.clone());
        active.mark_active(ChatId(7)).unwrap();
        active.mark_active(ChatId(8)).unwrap();
        active.mark_inactive(ChatId(7)).unwrap();
    }

    let (reloaded, receipts) = load(store);
    assert!(reloaded.is_active(ChatId(8)));
    assert!(!reloaded.is_active(ChatId(7)));
    assert!(receipts.requests().is_empty());
}

#[test]
fn redb_store_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.redb");

    {
        let (active, _) = load(RedbStore::open(&path).unwrap());
        active.mark_active(ChatId(11)).unwrap();
        active.mark_active(ChatId(12)).unwrap();
        active.mark_inactive(ChatId(11)).unwrap();
    }

    let (reloaded, _) = load(RedbStore::open(&path).unwrap());
    assert_eq!(reloaded.snapshot(), vec![ChatId(12)]);
}

#[test]
fn two_processes_share_one_state_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.redb");

    let (watcher, _) = load(RedbStore::open(&path).unwrap());
    let (room, receipts) = load(RedbStore::open(&path).unwrap());

    room.mark_active(ChatId(21)).unwrap();
    assert!(watcher.is_active(ChatId(21)));
    assert_eq!(receipts.count_for(ChatId(21)), 1);

    room.mark_inactive(ChatId(21)).unwrap();
    assert!(!watcher.is_active(ChatId(21)));
}

#[test]
fn separately_loaded_sets_do_not_overwrite_each_other() {
    let store = MemoryStore::new();
    let (first, _) = load(store.clone());
    let (second, _) = load(store.clone());

    first.mark_active(ChatId(1)).unwrap();
    second.mark_active(ChatId(2)).unwrap();

    assert_eq!(first.snapshot(), vec![ChatId(1), ChatId(2)]);
    assert_eq!(second.snapshot(), vec![ChatId(1), ChatId(2)]);
}

#[test]
fn unreadable_stored_value_loads_empty() {
    let store = MemoryStore::new();
    store.save(ACTIVE_CHATS_KEY, "{not an array").unwrap();

    let (active, _) = load(store.clone());
    assert!(active.snapshot().is_empty());

    active.mark_active(ChatId(2)).unwrap();
    assert_eq!(store.load(ACTIVE_CHATS_KEY).unwrap().as_deref(), Some("[2]"));
}

#[test]
fn clones_share_one_set() {
    let (active, _) = load(MemoryStore::new());
    let other = active.clone();

    other.mark_active(ChatId(5)).unwrap();
    assert!(active.is_active(ChatId(5)));
}

#[derive(Debug, Clone)]
enum Op {
    Enter(u64),
    Leave(u64),
    Reload,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u64..8).prop_map(Op::Enter),
        2 => (0u64..8).prop_map(Op::Leave),
        1 => Just(Op::Reload),
    ]
}

proptest! {
    #[test]
    fn set_matches_model_across_reloads(ops in prop::collection::vec(op(), 1..40)) {
        let store = MemoryStore::new();
        let (mut active, _) = load(store.clone());
        let mut model = BTreeSet::new();

        for op in ops {
            match op {
                Op::Enter(id) => {
                    active.mark_active(ChatId(id)).unwrap();
                    model.insert(ChatId(id));
                },
                Op::Leave(id) => {
                    active.mark_inactive(ChatId(id)).unwrap();
                    model.remove(&ChatId(id));
                },
                Op::Reload => {
                    drop(active);
                    active = load(store.clone()).0;
                },
            }

            let snapshot: BTreeSet<ChatId> = active.snapshot().into_iter().collect();
            prop_assert_eq!(&snapshot, &model);
        }
    }
}
