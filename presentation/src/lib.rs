//! Presentation layer for safra
//!
//! CLI argument definitions, the interactive chat REPL, and console
//! rendering of exchange signals.

pub mod chat;
pub mod cli;
pub mod output;

// Re-export main types
pub use chat::ChatRepl;
pub use cli::commands::Cli;
pub use output::ConsoleNotifier;
