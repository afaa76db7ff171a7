//! Conversation entities

use serde::{Deserialize, Serialize};

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// Descriptor of a file attached to a user message.
///
/// Informational only — the binary content is uploaded elsewhere and never
/// passes through the chat core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub size: u64,
}

impl Attachment {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// A message in a conversation transcript (Entity)
///
/// Agent entries start as empty placeholders and have `content` appended
/// incrementally while a response streams in. `created_at` is a logical
/// timestamp in whole seconds; it is assigned at insertion and refreshed
/// when the exchange completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub created_at: i64,
    /// Server-assigned identifier, absent until the response confirms it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Set when the streaming exchange that was filling this entry failed.
    #[serde(default)]
    pub streaming_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<Attachment>>,
}

impl Message {
    /// A user entry with optional attachment descriptors.
    pub fn user(content: impl Into<String>, files: Option<Vec<Attachment>>, created_at: i64) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            created_at,
            id: None,
            streaming_error: false,
            files,
        }
    }

    /// The empty agent entry inserted optimistically before any response
    /// content arrives.
    pub fn agent_placeholder(created_at: i64) -> Self {
        Self {
            role: Role::Agent,
            content: String::new(),
            created_at,
            id: None,
            streaming_error: false,
            files: None,
        }
    }

    pub fn is_agent(&self) -> bool {
        self.role == Role::Agent
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}
