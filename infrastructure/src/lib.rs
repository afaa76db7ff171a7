//! Infrastructure layer for safra
//!
//! External adapters behind the application layer's ports: the HTTP chat
//! backend with SSE stream decoding, configuration loading, the JSONL
//! conversation logger, and the file-backed session directory.

pub mod backend;
pub mod config;
pub mod logging;
pub mod session;

// Re-export commonly used types
pub use backend::{HttpChatBackend, SseLineDecoder};
pub use config::{BackendConfig, ConfigLoader, FileConfig, LoggingConfig};
pub use logging::JsonlConversationLogger;
pub use session::{FileSessionDirectory, SessionEntry};
