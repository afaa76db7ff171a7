//! Error classification.
//!
//! Maps raw backend failures to the fixed set of user-facing messages and
//! decides whether the stored session id must be cleared so the next send
//! falls back to a fresh one-shot exchange. Pure functions, no side effects.

use crate::ports::chat_backend::BackendError;

/// Message shown when the backend rejects the current session.
pub const SESSION_INVALID_MESSAGE: &str =
    "This conversation is no longer valid. Please resend your message to start a new one.";

/// Message shown on a 401 response.
pub const UNAUTHORIZED_MESSAGE: &str = "Your session expired. Please log in again.";

/// Message shown on a 500 response.
pub const SERVER_FAULT_MESSAGE: &str =
    "The assistant hit an internal error. Please try again shortly.";

/// A backend failure normalized for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    /// Human-facing message (toast + transient error state).
    pub message: String,
    /// True when the stored session id must be cleared so the next send
    /// re-creates one.
    pub invalidates_session: bool,
}

/// Classify a backend error.
pub fn classify_error(error: &BackendError) -> ClassifiedError {
    let (status, detail) = error.parts();
    classify_detail(status, detail)
}

/// Classify a failure from its HTTP status (when known) and detail text.
///
/// The session-text check runs first: it is the only branch with a side
/// effect (clearing the stored session id), and the backend reports session
/// expiry under more than one status code.
pub fn classify_detail(status: Option<u16>, detail: &str) -> ClassifiedError {
    if detail.to_lowercase().contains("session") {
        return ClassifiedError {
            message: SESSION_INVALID_MESSAGE.to_string(),
            invalidates_session: true,
        };
    }

    let message = match status {
        Some(401) => UNAUTHORIZED_MESSAGE.to_string(),
        Some(500) => SERVER_FAULT_MESSAGE.to_string(),
        _ => detail.to_string(),
    };

    ClassifiedError {
        message,
        invalidates_session: false,
    }
}
