//! Configuration file schema.

use serde::{Deserialize, Serialize};

/// Top-level configuration, merged from defaults and TOML files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub backend: BackendConfig,
    pub logging: LoggingConfig,
}

/// Chat backend endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the assistant backend.
    pub base_url: String,
    /// Path of the one-shot chat endpoint.
    pub chat_path: String,
    /// Path of the streaming chat endpoint.
    pub stream_path: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            chat_path: "/api/chat".to_string(),
            stream_path: "/api/chat/stream".to_string(),
        }
    }
}

impl BackendConfig {
    pub fn chat_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.chat_path)
    }

    pub fn stream_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.stream_path)
    }
}

/// Conversation logging options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write a JSONL record of every exchange under the data directory.
    pub conversation_log: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            conversation_log: false,
        }
    }
}
