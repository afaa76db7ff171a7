//! Application use cases

pub mod send_message;
