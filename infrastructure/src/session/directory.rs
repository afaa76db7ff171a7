//! File-backed session directory.
//!
//! Implements the [`SessionDirectory`] port over a JSON file in the user's
//! data directory: the caller-maintained session list, newest first, plus
//! the durable copy of the most recent session id. Failures are logged and
//! swallowed per the port contract — losing a directory write must never
//! break an exchange.

use safra_application::SessionDirectory;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// One entry in the stored session list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub session_id: String,
    /// RFC 3339 creation time, informational.
    pub created_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DirectoryFile {
    sessions: Vec<SessionEntry>,
}

/// Session directory persisted as a JSON file.
pub struct FileSessionDirectory {
    path: PathBuf,
    state: Mutex<DirectoryFile>,
}

impl FileSessionDirectory {
    /// Open (or start) the directory at the given path.
    ///
    /// A missing or unreadable file starts an empty directory; an exchange
    /// must not fail because the session list is corrupt.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let state = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!("Corrupt session directory {}: {}", path.display(), e);
                DirectoryFile::default()
            }),
            Err(_) => DirectoryFile::default(),
        };
        Self {
            path,
            state: Mutex::new(state),
        }
    }

    /// The stored session list, newest first.
    pub fn sessions(&self) -> Vec<SessionEntry> {
        self.state.lock().unwrap().sessions.clone()
    }

    /// The most recently recorded session id, if any.
    pub fn latest(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .sessions
            .first()
            .map(|e| e.session_id.clone())
    }

    fn persist(&self, state: &DirectoryFile) {
        if let Some(parent) = self.path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create session directory {}: {}",
                parent.display(),
                e
            );
            return;
        }
        let Ok(text) = serde_json::to_string_pretty(state) else {
            return;
        };
        if let Err(e) = std::fs::write(&self.path, text) {
            warn!(
                "Could not persist session directory {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

impl SessionDirectory for FileSessionDirectory {
    fn record(&self, session_id: &str) {
        let mut state = self.state.lock().unwrap();
        if state.sessions.iter().any(|e| e.session_id == session_id) {
            return;
        }
        // Newest sessions go to the head of the list
        state.sessions.insert(
            0,
            SessionEntry {
                session_id: session_id.to_string(),
                created_at: chrono::Utc::now()
                    .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            },
        );
        self.persist(&state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_at_the_head() {
        let dir = tempfile::tempdir().unwrap();
        let directory = FileSessionDirectory::open(dir.path().join("sessions.json"));

        directory.record("s1");
        directory.record("s2");

        let sessions = directory.sessions();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session_id, "s2");
        assert_eq!(sessions[1].session_id, "s1");
        assert_eq!(directory.latest().as_deref(), Some("s2"));
    }

    #[test]
    fn record_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let directory = FileSessionDirectory::open(dir.path().join("sessions.json"));

        directory.record("s1");
        directory.record("s1");
        assert_eq!(directory.sessions().len(), 1);
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        FileSessionDirectory::open(&path).record("s1");

        let reopened = FileSessionDirectory::open(&path);
        assert_eq!(reopened.latest().as_deref(), Some("s1"));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        std::fs::write(&path, "{ not json").unwrap();

        let directory = FileSessionDirectory::open(&path);
        assert!(directory.sessions().is_empty());
    }
}
