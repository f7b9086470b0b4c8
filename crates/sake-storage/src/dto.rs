//! Persisted document schema.
//!
//! The schema is default-tolerant: a field missing from an older file
//! takes its default instead of failing the load, so records written by
//! previous versions keep loading.

use sake_core::contract::CompiledContract;
use sake_core::session::SessionSnapshot;
use serde::{Deserialize, Serialize};

/// Current version written to new documents.
pub const STORAGE_VERSION: u32 = 1;

fn default_version() -> u32 {
    STORAGE_VERSION
}

/// The root of the workspace state document.
///
/// Carries every session's snapshot plus the workspace-wide shared state:
/// the compiled-contract set and which session was active, so a restart
/// restores the full surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredState {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Session that was active when the document was written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_session_id: Option<String>,
    /// Workspace-wide compiled contract set
    #[serde(default)]
    pub compiled_contracts: Vec<CompiledContract>,
    /// One snapshot per persisted session
    #[serde(default)]
    pub sessions: Vec<SessionSnapshot>,
}

impl Default for StoredState {
    fn default() -> Self {
        Self {
            version: STORAGE_VERSION,
            active_session_id: None,
            compiled_contracts: Vec::new(),
            sessions: Vec::new(),
        }
    }
}

impl StoredState {
    /// Inserts or replaces the snapshot with the same session id.
    pub fn upsert_session(&mut self, snapshot: SessionSnapshot) {
        self.sessions.retain(|s| s.id != snapshot.id);
        self.sessions.push(snapshot);
    }

    /// Drops the snapshot with the given id, if present.
    pub fn remove_session(&mut self, id: &str) {
        self.sessions.retain(|s| s.id != id);
        if self.active_session_id.as_deref() == Some(id) {
            self.active_session_id = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_document_takes_defaults() {
        let state: StoredState = serde_json::from_value(json!({})).unwrap();
        assert_eq!(state.version, STORAGE_VERSION);
        assert!(state.sessions.is_empty());
        assert!(state.active_session_id.is_none());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let state: StoredState =
            serde_json::from_value(json!({"version": 1, "futureField": true})).unwrap();
        assert_eq!(state.version, 1);
    }
}
