//! Chat backend adapter
//!
//! Implements the application's `ChatBackend` port over HTTP, with SSE line
//! decoding for the streaming endpoint.

pub mod http;
pub mod sse;

pub use http::HttpChatBackend;
pub use sse::SseLineDecoder;
