//! The set of chats currently on screen.
//!
//! Consulted by the notification socket for every per-chat notice: a notice
//! for an active chat is turned into a read receipt instead of being shown.
//! The store is the source of truth: every operation re-reads the persisted
//! set before acting, so a room session and a notification watcher in
//! separate processes that share one state file see each other's changes.
//! Changes are written through at once, so the set also survives a restart.

use std::{collections::BTreeSet, fmt, sync::Arc};

use parking_lot::Mutex;
use petchat_proto::ChatId;
use tracing::{debug, warn};

use crate::{ChatStore, StoreError};

/// Store key of the persisted set. Value is a JSON array of chat ids.
pub const ACTIVE_CHATS_KEY: &str = "activeChats";

/// Sink for "mark as read" requests.
///
/// Fire-and-forget: implementations queue the request and log failures.
pub trait ReadReceipts: Send + Sync {
    /// Ask the backend to mark every message in `chat` as read.
    fn mark_as_read(&self, chat: ChatId);
}

struct Inner {
    chats: BTreeSet<ChatId>,
    store: Box<dyn ChatStore>,
}

impl Inner {
    /// Re-read the persisted set.
    fn refresh(&mut self) -> Result<(), StoreError> {
        self.chats = decode(self.store.load(ACTIVE_CHATS_KEY)?);
        Ok(())
    }

    /// Re-read the persisted set, keeping the last known one if the store
    /// cannot be read.
    fn refresh_or_keep(&mut self) {
        if let Err(err) = self.refresh() {
            warn!(error = %err, "active chat set unreadable, using last known");
        }
    }

    /// Persist `next` and adopt it. On failure the set is unchanged.
    fn commit(&mut self, next: BTreeSet<ChatId>) -> Result<(), StoreError> {
        let ids: Vec<ChatId> = next.iter().copied().collect();
        let encoded = serde_json::to_string(&ids)?;
        self.store.save(ACTIVE_CHATS_KEY, &encoded)?;
        self.chats = next;
        Ok(())
    }
}

/// Shared handle to the active-chat set.
///
/// Clones refer to the same set. Each operation holds one lock across the
/// mutation and the write, so concurrent callers never interleave.
#[derive(Clone)]
pub struct ActiveChats {
    inner: Arc<Mutex<Inner>>,
    receipts: Arc<dyn ReadReceipts>,
}

impl ActiveChats {
    /// Load the persisted set from `store`.
    ///
    /// A missing key yields an empty set. A value that is not a JSON array of
    /// ids is logged and replaced by an empty set on the next write.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the first read fails.
    pub fn load(
        store: impl ChatStore,
        receipts: Arc<dyn ReadReceipts>,
    ) -> Result<Self, StoreError> {
        let chats = decode(store.load(ACTIVE_CHATS_KEY)?);

        debug!(count = chats.len(), "loaded active chats");

        Ok(Self {
            inner: Arc::new(Mutex::new(Inner { chats, store: Box::new(store) })),
            receipts,
        })
    }

    /// Add `chat` to the set, persist, then request a read receipt for it.
    ///
    /// The receipt is requested even if the chat was already active.
    pub fn mark_active(&self, chat: ChatId) -> Result<(), StoreError> {
        {
            let mut inner = self.inner.lock();
            inner.refresh()?;
            if !inner.chats.contains(&chat) {
                let mut next = inner.chats.clone();
                next.insert(chat);
                inner.commit(next)?;
            }
        }

        debug!(%chat, "chat active");
        self.receipts.mark_as_read(chat);
        Ok(())
    }

    /// Remove `chat` from the set and persist.
    pub fn mark_inactive(&self, chat: ChatId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.refresh()?;
        if inner.chats.contains(&chat) {
            let mut next = inner.chats.clone();
            next.remove(&chat);
            inner.commit(next)?;
            debug!(%chat, "chat inactive");
        }
        Ok(())
    }

    /// Whether `chat` is on screen.
    pub fn is_active(&self, chat: ChatId) -> bool {
        let mut inner = self.inner.lock();
        inner.refresh_or_keep();
        inner.chats.contains(&chat)
    }

    /// Active chats in ascending id order.
    pub fn snapshot(&self) -> Vec<ChatId> {
        let mut inner = self.inner.lock();
        inner.refresh_or_keep();
        inner.chats.iter().copied().collect()
    }

    /// Request a read receipt without touching the set.
    pub(crate) fn mark_read(&self, chat: ChatId) {
        self.receipts.mark_as_read(chat);
    }
}

/// Parse a persisted value. Anything but a JSON array of ids reads as empty
/// and is replaced on the next write.
fn decode(raw: Option<String>) -> BTreeSet<ChatId> {
    let Some(raw) = raw else {
        return BTreeSet::new();
    };

    match serde_json::from_str::<Vec<ChatId>>(&raw) {
        Ok(ids) => ids.into_iter().collect(),
        Err(err) => {
            warn!(error = %err, "discarding unreadable active chat set");
            BTreeSet::new()
        },
    }
}

impl fmt::Debug for ActiveChats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chats: Vec<ChatId> = self.inner.lock().chats.iter().copied().collect();
        f.debug_struct("ActiveChats").field("chats", &chats).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::MemoryStore;

    #[derive(Default)]
    struct CountingReceipts(AtomicUsize);

    impl ReadReceipts for CountingReceipts {
        fn mark_as_read(&self, _chat: ChatId) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct BrokenStore;

    impl ChatStore for BrokenStore {
        fn load(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn save(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Io("disk full".into()))
        }
    }

    #[test]
    fn mark_active_persists_and_requests_receipt() {
        let store = MemoryStore::new();
        let receipts = Arc::new(CountingReceipts::default());
        let chats = ActiveChats::load(store.clone(), receipts.clone()).unwrap();

        chats.mark_active(ChatId(3)).unwrap();

        assert!(chats.is_active(ChatId(3)));
        assert_eq!(store.load(ACTIVE_CHATS_KEY).unwrap().as_deref(), Some("[3]"));
        assert_eq!(receipts.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn corrupt_value_loads_as_empty() {
        let store = MemoryStore::new();
        store.save(ACTIVE_CHATS_KEY, "{not json").unwrap();

        let chats = ActiveChats::load(store, Arc::new(CountingReceipts::default())).unwrap();
        assert!(chats.snapshot().is_empty());
    }

    #[test]
    fn failed_write_leaves_set_unchanged() {
        let receipts = Arc::new(CountingReceipts::default());
        let chats = ActiveChats::load(BrokenStore, receipts.clone()).unwrap();

        assert!(chats.mark_active(ChatId(1)).is_err());
        assert!(!chats.is_active(ChatId(1)));
        assert_eq!(receipts.0.load(Ordering::SeqCst), 0);
    }
}
