//! Streaming events for chat backend communication.
//!
//! [`StreamEvent`] represents individual events decoded from a streaming chat
//! response, enabling incremental display of the answer as it is generated.

/// An event in a streaming chat response.
///
/// Used to bridge infrastructure-level streaming (newline-delimited SSE
/// chunks from the backend) to the application layer. One event is produced
/// per decoded protocol line.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A text delta to append to the agent entry being filled.
    Content(String),
    /// Advisory token-usage payload. Opaque to the core; logged only.
    Usage(serde_json::Value),
    /// The stream completed normally.
    Done,
    /// The backend reported an error mid-stream.
    Error(String),
}

impl StreamEvent {
    /// Returns the delta text if this is a Content event.
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamEvent::Content(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true if this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error(_))
    }
}

impl PartialEq for StreamEvent {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (StreamEvent::Content(a), StreamEvent::Content(b)) => a == b,
            (StreamEvent::Usage(a), StreamEvent::Usage(b)) => a == b,
            (StreamEvent::Done, StreamEvent::Done) => true,
            (StreamEvent::Error(a), StreamEvent::Error(b)) => a == b,
            _ => false,
        }
    }
}
