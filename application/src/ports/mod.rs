//! Ports (interfaces) for the application layer

pub mod chat_backend;
pub mod conversation_logger;
pub mod notifier;
pub mod session_directory;
