//! Conversation transcript (Entity)
//!
//! [`Transcript`] owns the ordered message log of one conversation plus the
//! `streaming` flag. All mutations the orchestrator performs go through the
//! primitives here, so the find-last-agent invariants are encoded and tested
//! in one place instead of being inlined at each call site.

use super::entities::{Message, Role};

/// Ordered mutable log of messages plus a streaming flag.
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    messages: Vec<Message>,
    streaming: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn set_streaming(&mut self, streaming: bool) {
        self.streaming = streaming;
    }

    /// Append a message to the log.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append a content delta to the most recent agent entry.
    ///
    /// Deltas are applied strictly in call order — plain concatenation, no
    /// reordering or coalescing. Does nothing if no agent entry exists.
    pub fn append_to_last_agent(&mut self, delta: &str) {
        if let Some(entry) = self.last_agent_mut() {
            entry.content.push_str(delta);
        }
    }

    /// Replace the most recent agent entry's content wholesale (one-shot
    /// path), attach the server-assigned message id, and refresh the
    /// timestamp.
    pub fn complete_last_agent(&mut self, text: &str, id: Option<String>, now: i64) {
        if let Some(entry) = self.last_agent_mut() {
            entry.content = text.to_string();
            entry.id = id;
            entry.created_at = now;
        }
    }

    /// Refresh the most recent agent entry's timestamp (normal streaming
    /// completion).
    pub fn refresh_last_agent_timestamp(&mut self, now: i64) {
        if let Some(entry) = self.last_agent_mut() {
            entry.created_at = now;
        }
    }

    /// Flag the most recent agent entry as having failed mid-stream.
    pub fn mark_last_agent_error(&mut self) {
        if let Some(entry) = self.last_agent_mut() {
            entry.streaming_error = true;
        }
    }

    /// Remove a trailing `[user, agent(streaming_error)]` pair.
    ///
    /// Called before a resend so a failed exchange is replaced rather than
    /// accumulated. Returns true if a pair was removed.
    pub fn prune_failed_pair(&mut self) -> bool {
        let n = self.messages.len();
        if n < 2 {
            return false;
        }
        let failed_tail = self.messages[n - 1].role == Role::Agent
            && self.messages[n - 1].streaming_error
            && self.messages[n - 2].role == Role::User;
        if failed_tail {
            self.messages.truncate(n - 2);
        }
        failed_tail
    }

    fn last_agent_mut(&mut self) -> Option<&mut Message> {
        self.messages.iter_mut().rev().find(|m| m.is_agent())
    }
}
