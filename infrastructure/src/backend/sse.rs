//! SSE line decoding for streaming chat responses.
//!
//! The backend streams answers as a chunked body of newline-delimited
//! SSE-style lines. Chunk boundaries are arbitrary — a logical line can be
//! split across reads — so [`SseLineDecoder`] buffers the trailing partial
//! line between [`feed`](SseLineDecoder::feed) calls.
//!
//! Decoding is **fail-open**: a line that is not valid JSON and not the
//! `[DONE]` sentinel degrades to a [`StreamEvent::Content`] carrying the raw
//! line. Dropping user-visible tokens is worse than showing an occasional
//! raw fragment, so nothing is discarded silently and no line ever aborts
//! the stream.

use safra_domain::StreamEvent;
use serde_json::Value;
use tracing::trace;

/// End-of-stream sentinel.
const DONE_SENTINEL: &str = "[DONE]";

/// Stateful decoder turning body chunks into [`StreamEvent`]s.
///
/// Buffers raw bytes rather than text: chunk boundaries can fall inside a
/// multi-byte UTF-8 sequence, and only complete lines are ever decoded to
/// text. Single-use: one decoder instance per streaming request.
#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buffer: Vec<u8>,
}

impl SseLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of body bytes, yielding events for every complete line.
    ///
    /// The final fragment after the last newline stays buffered for the next
    /// chunk.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(event) = decode_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Flush the buffered remainder when the body ends.
    ///
    /// A body that does not end in a newline still carries data in its last
    /// line; fail-open means decoding it rather than dropping it.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&String::from_utf8_lossy(&rest))
    }
}

/// Decode a single protocol line. Returns `None` for blank lines only.
fn decode_line(line: &str) -> Option<StreamEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    // SSE framing: strip the field name, keep the value
    let value = line
        .strip_prefix("data:")
        .map(str::trim_start)
        .unwrap_or(line);

    if value == DONE_SENTINEL {
        return Some(StreamEvent::Done);
    }

    match serde_json::from_str::<Value>(value) {
        Ok(Value::Object(object)) => Some(decode_object(object, value)),
        // A bare JSON string is a content delta
        Ok(Value::String(text)) => Some(StreamEvent::Content(text)),
        // Numbers, booleans, null, arrays: no defined meaning — same
        // fail-open path as unparseable lines
        Ok(_) | Err(_) => {
            trace!("undecodable stream line kept as content: {}", value);
            Some(StreamEvent::Content(value.to_string()))
        }
    }
}

fn decode_object(object: serde_json::Map<String, Value>, raw: &str) -> StreamEvent {
    match object.get("type").and_then(Value::as_str) {
        Some("content") => match object.get("content").and_then(Value::as_str) {
            Some(text) => StreamEvent::Content(text.to_string()),
            None => StreamEvent::Content(raw.to_string()),
        },
        Some("usage") => StreamEvent::Usage(
            object
                .get("payload")
                .cloned()
                .unwrap_or(Value::Object(object)),
        ),
        Some("done") => StreamEvent::Done,
        Some("error") => {
            let message = object
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            StreamEvent::Error(message.to_string())
        }
        // Unknown or missing type: keep the raw line visible
        _ => StreamEvent::Content(raw.to_string()),
    }
}
