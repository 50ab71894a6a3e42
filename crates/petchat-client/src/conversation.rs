//! Message list kept by a consumer of the room socket.
//!
//! The socket does not dedup. The server may echo a message the sender
//! already appended from the REST response, and a reconnect may redeliver
//! messages that are also in a freshly fetched history page. Appending
//! through [`Conversation`] keeps exactly one copy per message id.

use std::collections::HashSet;

use petchat_proto::MessageId;

use crate::ChatMessage;

/// Ordered message list with dedup by id.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    seen: HashSet<MessageId>,
}

impl Conversation {
    /// Empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `message` unless its id is already present.
    ///
    /// Returns true if appended.
    pub fn push(&mut self, message: ChatMessage) -> bool {
        if !self.seen.insert(message.id) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Merge a page of history, in any order, then restore id order.
    ///
    /// Returns how many messages were new.
    pub fn merge_history(&mut self, page: impl IntoIterator<Item = ChatMessage>) -> usize {
        let added = page.into_iter().filter(|m| self.seen.insert(m.id)).collect::<Vec<_>>();
        let count = added.len();

        if count > 0 {
            self.messages.extend(added);
            self.messages.sort_by_key(|m| m.id);
        }
        count
    }

    /// Whether a message with `id` is present.
    pub fn contains(&self, id: MessageId) -> bool {
        self.seen.contains(&id)
    }

    /// Smallest message id, for fetching the page before it.
    pub fn oldest_id(&self) -> Option<MessageId> {
        self.messages.iter().map(|m| m.id).min()
    }

    /// Messages in display order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether there are no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
