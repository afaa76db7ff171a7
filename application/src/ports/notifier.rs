//! UI notification port.
//!
//! The orchestrator is front-end agnostic; whatever surface hosts the chat
//! (REPL, desktop shell, web view) implements [`Notifier`] to receive the
//! signals that are not part of the transcript itself: streamed deltas for
//! live rendering, and one-shot error toasts.

/// Receives UI-facing signals from an exchange in flight.
///
/// All methods have no-op defaults so implementations only override what
/// they render.
pub trait Notifier: Send + Sync {
    /// An exchange started (streaming flag went up).
    fn on_exchange_start(&self) {}

    /// A content delta was appended to the agent entry. For one-shot
    /// exchanges this fires once with the full response text.
    fn on_content_delta(&self, _delta: &str) {}

    /// The exchange ended, successfully or not. The input surface should
    /// regain focus.
    fn on_exchange_end(&self) {}

    /// A classified, user-facing error message (toast-equivalent).
    fn notify_error(&self, _message: &str) {}
}

/// No-op implementation for tests and headless use.
pub struct NoNotifier;

impl Notifier for NoNotifier {}
