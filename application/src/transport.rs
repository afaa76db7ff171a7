//! Transport selection.
//!
//! Deciding between a one-shot and a streaming exchange is a pure function
//! of two inputs: the session id currently held by the conversation and an
//! explicit per-call override. Keeping it here, rather than as inline
//! conditionals at the call site, makes the rule independently testable.

/// Caller's explicit session override for one `send` call.
///
/// Mirrors the three states a caller can express: say nothing and inherit
/// the current session, force a fresh conversation, or target a specific
/// session id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOverride {
    /// No override — use the conversation's current session id.
    Inherit,
    /// Force a fresh session; the one-shot exchange will mint a new id.
    Fresh,
    /// Target this session id regardless of the current one.
    Use(String),
}

/// Which backend call shape to use for an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Single request/response; allocates a session id.
    OneShot,
    /// SSE-based streaming against an existing session.
    Streaming,
}

/// Resolve the session id and pick the transport.
///
/// The explicit override wins over the current session id. A resolved id
/// selects streaming; no id (or an empty one) selects one-shot, which is
/// responsible for allocating the session. Pure and deterministic.
pub fn select_transport(
    current: Option<&str>,
    override_: &SessionOverride,
) -> (Transport, Option<String>) {
    let resolved = match override_ {
        SessionOverride::Use(id) => Some(id.clone()),
        SessionOverride::Fresh => None,
        SessionOverride::Inherit => current.map(str::to_string),
    };
    // An empty id cannot address a session
    let resolved = resolved.filter(|id| !id.is_empty());

    match resolved {
        Some(id) => (Transport::Streaming, Some(id)),
        None => (Transport::OneShot, None),
    }
}
