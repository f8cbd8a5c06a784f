//! Fixed-length conversation history with a protected prefix.
//!
//! The loop keeps one of these per role. The prefix (system instructions,
//! and for the generator the task itself) is never evicted; everything after
//! it is a sliding window of the most recent turns.

use serde::Serialize;
use tracing::trace;

use crate::message::Message;

/// An ordered message history whose first `prefix_len` entries are pinned.
///
/// Invariants after every [`append`](Self::append):
/// - `history[..prefix_len]` is exactly the prefix given at construction
/// - `len() <= max(max_length, prefix_len)`
///
/// A `max_length` at or below the prefix length is a valid, degenerate
/// configuration: every append is immediately trimmed away.
#[derive(Debug, Clone, Serialize)]
pub struct BoundedConversation {
    history: Vec<Message>,
    prefix_len: usize,
    max_length: usize,
}

impl BoundedConversation {
    /// Create a conversation that starts as (and always keeps) `prefix`.
    pub fn new(prefix: Vec<Message>, max_length: usize) -> Self {
        let prefix_len = prefix.len();
        Self {
            history: prefix,
            prefix_len,
            max_length,
        }
    }

    /// Append a message, evicting the oldest non-prefix entries on overflow.
    pub fn append(&mut self, message: Message) {
        self.history.push(message);

        if self.history.len() > self.max_length {
            let keep = self.max_length.saturating_sub(self.prefix_len);
            let tail_start = self.history.len() - keep;
            let evicted = tail_start - self.prefix_len;
            self.history.drain(self.prefix_len..tail_start);
            trace!(
                evicted,
                len = self.history.len(),
                max = self.max_length,
                "Trimmed conversation history"
            );
        }
    }

    /// Snapshot of the current history, in order.
    pub fn messages(&self) -> Vec<Message> {
        self.history.clone()
    }

    /// The pinned prefix.
    pub fn prefix(&self) -> &[Message] {
        &self.history[..self.prefix_len]
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}
