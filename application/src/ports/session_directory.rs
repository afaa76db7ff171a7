//! Session directory port.
//!
//! Collaborator surface for the caller-maintained session list and the
//! "persist session id to durable client storage" concern. The chat core
//! treats both as one opaque call: when a one-shot exchange mints a session
//! id it has not seen before, it records it here.
//!
//! The method is intentionally synchronous and non-fallible — directory
//! failures must never disrupt an exchange in flight.

/// Port for recording newly minted sessions.
pub trait SessionDirectory: Send + Sync {
    /// Record a freshly minted session: insert it at the head of the session
    /// list (if not already present) and persist it to durable storage.
    /// Idempotent.
    fn record(&self, session_id: &str);
}

/// No-op implementation for tests and when no session list is maintained.
pub struct NoSessionDirectory;

impl SessionDirectory for NoSessionDirectory {
    fn record(&self, _session_id: &str) {}
}
