//! Session domain models.

use crate::account::Account;
use crate::adapter::NetworkDump;
use crate::contract::DeployedContract;
use crate::error::Result;
use crate::fingerprint::fingerprint;
use crate::transaction::TransactionRecord;
use serde::{Deserialize, Serialize};

/// The two kinds of session, dispatched by `match` at the few points where
/// their behavior differs (how a chain is brought up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// A chain spawned and owned by the backend for this session
    LocalNode,
    /// A connection to an already-running chain
    Connection,
}

/// Persistence bookkeeping for one session.
///
/// `is_dirty` is set whenever a state-mutating operation succeeds and
/// cleared only by a successful save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceMeta {
    #[serde(default)]
    pub is_dirty: bool,
    #[serde(default)]
    pub is_autosave_enabled: bool,
    /// Epoch milliseconds of the last successful save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_save_timestamp: Option<i64>,
}

impl Default for PersistenceMeta {
    fn default() -> Self {
        Self {
            is_dirty: false,
            is_autosave_enabled: false,
            last_save_timestamp: None,
        }
    }
}

/// The registry's list view of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub display_name: String,
    pub kind: SessionKind,
    pub connected: bool,
}

/// The serializable state subset a fingerprint is computed over.
///
/// Borrowed form so dumping does not clone three vectors twice.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSubset<'a> {
    pub accounts: &'a [Account],
    pub deployments: &'a [DeployedContract],
    pub history: &'a [TransactionRecord],
}

/// A complete dump of one session: store contents plus the authoritative
/// chain dump pulled from the backend, with an integrity fingerprint.
///
/// This is what the persistence layer serializes and what session
/// restoration consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: String,
    pub display_name: String,
    pub kind: SessionKind,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub deployments: Vec<DeployedContract>,
    #[serde(default)]
    pub history: Vec<TransactionRecord>,
    pub network: NetworkDump,
    pub state_fingerprint: String,
    #[serde(default)]
    pub persistence: PersistenceMeta,
}

impl SessionSnapshot {
    /// Recomputes the fingerprint over the snapshot's state subset.
    ///
    /// Used best-effort on load to detect drift between the dump and the
    /// expected state; a mismatch is reported, never fatal.
    pub fn compute_fingerprint(&self) -> Result<String> {
        fingerprint(&StateSubset {
            accounts: &self.accounts,
            deployments: &self.deployments,
            history: &self.history,
        })
    }
}
