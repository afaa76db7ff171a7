//! Application layer for safra
//!
//! Use cases and ports for the CPR assistant chat core. The central piece is
//! [`ChatService`], which orchestrates one exchange end to end: optimistic
//! transcript insert, transport selection (one-shot vs streaming),
//! incremental delta application, completion/error finalization, and
//! cancellation.
//!
//! Infrastructure adapters (HTTP backend, SSE decoding, persistence) live in
//! `safra-infrastructure` and plug in through the ports defined here.

pub mod classify;
pub mod ports;
pub mod session_tracker;
pub mod transport;
pub mod use_cases;

// Re-export commonly used types
pub use classify::{ClassifiedError, classify_detail, classify_error};
pub use ports::chat_backend::{BackendError, ChatBackend, OneShotReply, StreamHandle};
pub use ports::conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger};
pub use ports::notifier::{NoNotifier, Notifier};
pub use ports::session_directory::{NoSessionDirectory, SessionDirectory};
pub use session_tracker::LocalSessionTracker;
pub use transport::{SessionOverride, Transport, select_transport};
pub use use_cases::send_message::{ChatService, SendOutcome};
