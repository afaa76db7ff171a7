//! Locally-created session tracking.
//!
//! [`LocalSessionTracker`] remembers which session ids were minted by *this*
//! client run. Callers use it to skip the redundant "does this session exist
//! server-side" reconciliation fetch right after local creation — an
//! optimization, not a correctness boundary. Never persisted across runs.

use std::collections::HashSet;
use std::sync::Mutex;

/// Set of session ids created by this client instance.
#[derive(Debug, Default)]
pub struct LocalSessionTracker {
    ids: Mutex<HashSet<String>>,
}

impl LocalSessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, session_id: &str) {
        self.ids.lock().unwrap().insert(session_id.to_string());
    }

    pub fn has(&self, session_id: &str) -> bool {
        self.ids.lock().unwrap().contains(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_added_ids() {
        let tracker = LocalSessionTracker::new();
        assert!(!tracker.has("s1"));
        tracker.add("s1");
        assert!(tracker.has("s1"));
        assert!(!tracker.has("s2"));
    }

    #[test]
    fn add_is_idempotent() {
        let tracker = LocalSessionTracker::new();
        tracker.add("s1");
        tracker.add("s1");
        assert!(tracker.has("s1"));
    }
}
