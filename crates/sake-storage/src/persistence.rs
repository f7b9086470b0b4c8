//! Persistence manager.
//!
//! Serializes session snapshots plus workspace-wide shared state into one
//! versioned JSON document, written atomically to the workspace's
//! `.sake/state.json`. File IO runs on the blocking pool so saves never
//! stall the async runtime.

use crate::dto::StoredState;
use crate::paths::SakePaths;
use crate::storage::AtomicJsonFile;
use sake_core::contract::CompiledContract;
use sake_core::error::{Result, SakeError};
use sake_core::session::SessionSnapshot;
use std::sync::{Arc, Mutex};

/// Result of loading the workspace document.
pub struct LoadOutcome {
    pub state: StoredState,
    /// Best-effort integrity findings (fingerprint drift). Reported to the
    /// user, never a load failure.
    pub warnings: Vec<String>,
}

/// Reads and writes the workspace state document.
#[derive(Clone)]
pub struct PersistenceManager {
    file: Arc<AtomicJsonFile<StoredState>>,
    /// Last issued save timestamp; bumped so consecutive saves always
    /// stamp strictly increasing values even within one millisecond.
    last_stamp: Arc<Mutex<i64>>,
}

impl PersistenceManager {
    pub fn new(paths: &SakePaths) -> Self {
        Self {
            file: Arc::new(AtomicJsonFile::new(paths.state_file())),
            last_stamp: Arc::new(Mutex::new(0)),
        }
    }

    /// Writes one session's snapshot into the document.
    ///
    /// The stored record is marked clean and stamped; the returned
    /// timestamp is what the caller feeds back into the live session's
    /// persistence meta.
    pub async fn save_snapshot(&self, mut snapshot: SessionSnapshot) -> Result<i64> {
        let timestamp = self.next_timestamp();
        snapshot.persistence.is_dirty = false;
        snapshot.persistence.last_save_timestamp = Some(timestamp);

        let file = Arc::clone(&self.file);
        let id = snapshot.id.clone();
        self.run_blocking(move || {
            file.update(StoredState::default(), |state| {
                state.upsert_session(snapshot);
                Ok(())
            })
        })
        .await?;

        tracing::info!(target: "sake::storage", session = %id, timestamp, "session saved");
        Ok(timestamp)
    }

    /// Writes the workspace-wide shared state (active selection and the
    /// compiled-contract set).
    pub async fn save_shared(
        &self,
        active_session_id: Option<String>,
        compiled_contracts: Vec<CompiledContract>,
    ) -> Result<()> {
        let file = Arc::clone(&self.file);
        self.run_blocking(move || {
            file.update(StoredState::default(), |state| {
                state.active_session_id = active_session_id;
                state.compiled_contracts = compiled_contracts;
                Ok(())
            })
        })
        .await
    }

    /// Drops one session's record from the document.
    pub async fn remove_session(&self, id: &str) -> Result<()> {
        let file = Arc::clone(&self.file);
        let id = id.to_string();
        self.run_blocking(move || {
            file.update(StoredState::default(), |state| {
                state.remove_session(&id);
                Ok(())
            })
        })
        .await
    }

    /// Loads the workspace document.
    ///
    /// A missing file yields an empty default document. Each snapshot's
    /// fingerprint is re-verified best-effort: drift produces a warning
    /// for the user, not a failure.
    pub async fn load(&self) -> Result<LoadOutcome> {
        let file = Arc::clone(&self.file);
        let state = self
            .run_blocking(move || file.load())
            .await?
            .unwrap_or_default();

        let mut warnings = Vec::new();
        for snapshot in &state.sessions {
            match snapshot.compute_fingerprint() {
                Ok(fingerprint) if fingerprint == snapshot.state_fingerprint => {}
                Ok(_) => {
                    tracing::warn!(
                        target: "sake::storage",
                        session = %snapshot.id,
                        "state fingerprint mismatch on load"
                    );
                    warnings.push(format!(
                        "Saved state of session '{}' does not match its fingerprint; it may have drifted",
                        snapshot.display_name
                    ));
                }
                Err(err) => {
                    warnings.push(format!(
                        "Could not verify saved state of session '{}': {err}",
                        snapshot.display_name
                    ));
                }
            }
        }

        Ok(LoadOutcome { state, warnings })
    }

    fn next_timestamp(&self) -> i64 {
        let mut last = self.last_stamp.lock().expect("stamp lock poisoned");
        let now = chrono::Utc::now().timestamp_millis();
        *last = if now > *last { now } else { *last + 1 };
        *last
    }

    async fn run_blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|err| SakeError::internal(format!("storage task failed: {err}")))?
    }
}
