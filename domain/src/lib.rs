//! Domain layer for safra
//!
//! This crate contains the conversation entities and transcript logic for the
//! CPR assistant chat core. It has no dependencies on infrastructure or
//! presentation concerns.
//!
//! # Core Concepts
//!
//! ## Transcript
//!
//! The ordered message log of one conversation. Agent entries are filled
//! incrementally while a response streams in; the transcript exposes a small
//! set of mutation primitives so the search-and-mutate invariants live in one
//! tested place instead of at every call site.
//!
//! ## StreamEvent
//!
//! The decoded wire-level events of a streaming exchange: content deltas,
//! advisory usage payloads, completion, and stream errors.

pub mod conversation;

// Re-export commonly used types
pub use conversation::{
    entities::{Attachment, Message, Role},
    stream::StreamEvent,
    transcript::Transcript,
};
