//! Bridge ↔ UI message envelopes.
//!
//! Every message crossing the process boundary is a tagged union
//! discriminated by its `command` field and validated at this boundary,
//! so both sides agree on shape without runtime duck-typing. Messages
//! without a `requestId` are one-way broadcasts; a request carries one and
//! expects exactly one reply echoing it.

use sake_core::notice::Notice;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifies one state concern mirrored to the UI.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum StateId {
    Accounts,
    Deployments,
    CompiledContracts,
    History,
    /// The session list view (id, name, kind, connected)
    Chains,
}

/// Messages sent from the bridge to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UiMessage {
    /// Broadcast: a mirrored state concern changed.
    StateUpdate { state_id: StateId, payload: Value },
    /// Reply to a [`UiRequest`], correlated by `request_id`.
    Reply { request_id: String, payload: Value },
    /// A user-facing notification.
    Notice { notice: Notice },
}

/// Messages sent from the UI to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UiRequest {
    /// On-demand pull of one state concern's current value.
    GetState { state_id: StateId, request_id: String },
}
