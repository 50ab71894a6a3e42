//! Read-receipt recorder.

use std::sync::Arc;

use parking_lot::Mutex;
use petchat_client::ReadReceipts;
use petchat_proto::ChatId;

/// Remembers every mark-as-read request. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingReceipts {
    requests: Arc<Mutex<Vec<ChatId>>>,
}

impl RecordingReceipts {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests so far, oldest first.
    pub fn requests(&self) -> Vec<ChatId> {
        self.requests.lock().clone()
    }

    /// Requests for `chat`.
    pub fn count_for(&self, chat: ChatId) -> usize {
        self.requests.lock().iter().filter(|c| **c == chat).count()
    }

    /// Drain the record.
    pub fn take(&self) -> Vec<ChatId> {
        std::mem::take(&mut *self.requests.lock())
    }
}

impl ReadReceipts for RecordingReceipts {
    fn mark_as_read(&self, chat: ChatId) {
        tracing::trace!(%chat, "read receipt recorded");
        self.requests.lock().push(chat);
    }
}
