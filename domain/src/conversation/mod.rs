//! Conversation domain: messages, transcript, and streaming events.

pub mod entities;
pub mod stream;
pub mod transcript;
