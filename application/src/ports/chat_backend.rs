//! Chat backend port
//!
//! Defines the interface for communicating with the CPR assistant backend.
//!
//! Two call shapes exist: a **one-shot** exchange (single request/response,
//! used when no session exists yet — the response allocates the session id)
//! and a **streaming** exchange (SSE-based, used once a session exists).
//! Which one is used is decided by
//! [`select_transport`](crate::transport::select_transport).

use async_trait::async_trait;
use safra_domain::StreamEvent;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur during backend operations
#[derive(Error, Debug)]
pub enum BackendError {
    /// Non-2xx response with a backend-supplied detail message.
    #[error("Backend error ({status}): {detail}")]
    Api { status: u16, detail: String },

    /// Connection-level failure (DNS, refused, reset, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// The response body could not be interpreted.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The backend reported an error mid-stream via an `error` event.
    #[error("Stream error: {0}")]
    Stream(String),
}

impl BackendError {
    /// Split into the HTTP status (when known) and the human-facing detail,
    /// the two inputs error classification works on.
    pub fn parts(&self) -> (Option<u16>, &str) {
        match self {
            BackendError::Api { status, detail } => (Some(*status), detail),
            BackendError::Network(msg)
            | BackendError::Protocol(msg)
            | BackendError::Stream(msg) => (None, msg),
        }
    }
}

/// Successful one-shot exchange response.
///
/// The first exchange of a conversation goes through the one-shot endpoint,
/// whose response also allocates the session identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneShotReply {
    pub session_id: String,
    pub text: String,
    pub message_id: Option<String>,
}

/// Handle for receiving decoded streaming events from an open exchange.
///
/// Wraps an `mpsc::Receiver<StreamEvent>`. Dropping the handle hangs up on
/// the producing task, which aborts the underlying transport — this is how
/// cancellation propagates to the wire.
pub struct StreamHandle {
    receiver: mpsc::Receiver<StreamEvent>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// Build a handle over a fixed event sequence. Mostly useful for mocks.
    pub fn from_events(events: Vec<StreamEvent>) -> Self {
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            // Capacity covers the whole sequence, so this cannot fail
            let _ = tx.try_send(event);
        }
        Self { receiver: rx }
    }

    /// Receive the next event; `None` means the stream has ended.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.receiver.recv().await
    }
}

/// Backend for chat exchanges
///
/// This port defines how the application layer talks to the assistant
/// backend. The HTTP adapter lives in the infrastructure layer. Credentials
/// ride on the transport (same-origin cookies), not on this interface.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// One-shot exchange. `session_id` is `None` for the first exchange of a
    /// conversation; the reply carries the allocated session id either way.
    async fn complete(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<OneShotReply, BackendError>;

    /// Open a streaming exchange against an existing session.
    async fn open_stream(
        &self,
        message: &str,
        session_id: &str,
    ) -> Result<StreamHandle, BackendError>;
}
