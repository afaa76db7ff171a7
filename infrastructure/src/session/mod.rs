//! Session persistence adapters

pub mod directory;

pub use directory::{FileSessionDirectory, SessionEntry};
