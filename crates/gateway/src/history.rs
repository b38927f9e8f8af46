use std::{collections::VecDeque, num::NonZeroUsize};

use chatcast_protocol::CanonicalMessage;

/// Ordered, capacity-bounded message history (oldest first).
///
/// Invariant: `len()` never exceeds `max_messages` after a mutation. Overflow evicts
/// from the front.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    messages: VecDeque<CanonicalMessage>,
    max_messages: NonZeroUsize,
}

impl HistoryBuffer {
    pub fn new(max_messages: NonZeroUsize) -> Self {
        Self {
            messages: VecDeque::with_capacity(max_messages.get()),
            max_messages,
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Add a message at the end, evicting the oldest entries on overflow.
    pub fn append(&mut self, message: CanonicalMessage) {
        self.messages.push_back(message);
        self.evict_overflow();
    }

    /// Replace the whole buffer with the most recent `max_messages` entries of
    /// `messages`, sorted by timestamp ascending.
    pub fn replace_all(&mut self, messages: Vec<CanonicalMessage>) {
        self.messages = most_recent(messages, self.max_messages).into();
    }

    /// Ordered copy of the current contents.
    pub fn snapshot(&self) -> Vec<CanonicalMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    fn evict_overflow(&mut self) {
        while self.messages.len() > self.max_messages.get() {
            self.messages.pop_front();
        }
    }
}

/// Sort by timestamp (stable) and keep the last `max` entries.
pub fn most_recent(
    mut messages: Vec<CanonicalMessage>,
    max: NonZeroUsize,
) -> Vec<CanonicalMessage> {
    messages.sort_by_key(|m| m.timestamp);
    let excess = messages.len().saturating_sub(max.get());
    messages.drain(..excess);
    messages
}
