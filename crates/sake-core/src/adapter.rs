//! Network adapter port.
//!
//! The out-of-process chain backend is reached exclusively through this
//! trait: one adapter instance per session, pure request/response, no
//! state beyond connection liveness. Concrete implementations live in
//! `sake-network`; tests substitute in-memory mocks.

use crate::account::Address;
use crate::error::Result;
use async_trait::async_trait;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Connection parameters for a session's chain.
///
/// Immutable after session creation, except `uri` which the backend fills
/// in once a locally-spawned chain is listening.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Number of accounts to pre-fund on a new local chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounts: Option<u32>,
    /// Chain id to advertise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// URL to fork from, for forked local chains
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fork_url: Option<String>,
    /// Hardfork selection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardfork: Option<String>,
    /// Backend-assigned URI of the running chain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// What the backend reports after creating or connecting a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    /// URI of the running chain instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Pre-funded account addresses
    #[serde(default)]
    pub accounts: Vec<Address>,
}

/// Deployment request handed to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    /// Fully-qualified name of the compiled artifact
    pub contract_fqn: String,
    /// Display name of the contract
    pub name: String,
    /// ABI of the contract (used to record the deployment)
    pub abi: Value,
    /// Sender account
    pub sender: Address,
    /// Hex-encoded constructor calldata
    #[serde(default)]
    pub calldata: String,
    /// Value sent with the deployment
    #[serde(default)]
    pub value: U256,
}

/// Call/transact request handed to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    /// Target contract address
    pub to: Address,
    /// Sender account
    pub sender: Address,
    /// Function name or signature, for history display
    pub function: String,
    /// Hex-encoded calldata
    pub calldata: String,
    /// Value sent with the call
    #[serde(default)]
    pub value: U256,
}

/// Outcome of a deploy, call or transact backend operation.
///
/// `success = false` means the chain reverted the operation; the adapter
/// call itself succeeded and the outcome carries the trace of the revert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactOutcome {
    pub success: bool,
    /// Address of the deployed contract, for deployments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
    /// Hex-encoded raw return bytes
    #[serde(default)]
    pub return_value: String,
    /// Decoded return data, when the ABI allowed decoding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoded_return: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_trace: Option<Value>,
    /// Backend-side error message for reverted operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A contract discovered on-chain by address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnchainContract {
    pub address: Address,
    /// Name reported by the backend, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub abi: Value,
    /// Implementation chain, when the address is a proxy
    #[serde(default)]
    pub implementations: Vec<crate::contract::ImplementationContract>,
}

/// Raw chain dump as produced by the backend's `dump_state`.
///
/// Opaque to the orchestration layer; only the backend interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDump {
    /// Backend-defined serialized chain state
    pub raw: Value,
    /// Config of the chain the dump was taken from
    pub config: NetworkConfig,
}

/// Backend operations for one session.
///
/// Every method is a single request/response exchange; implementations
/// classify connection loss as [`crate::SakeError::ConnectionLost`] so the
/// session can flip its `connected` flag.
#[async_trait]
pub trait NetworkAdapter: Send + Sync {
    /// Spawns a new local chain for this session.
    async fn create_chain(&self, config: &NetworkConfig) -> Result<ChainInfo>;

    /// Connects to an already-running chain at `uri`.
    async fn connect_chain(&self, uri: &str) -> Result<ChainInfo>;

    /// Disconnects this session's chain.
    async fn disconnect(&self) -> Result<()>;

    /// Fetches balances for the given addresses.
    async fn get_balances(&self, addresses: &[Address]) -> Result<Vec<(Address, U256)>>;

    /// Overrides an account's balance.
    async fn set_balance(&self, address: &Address, balance: U256) -> Result<()>;

    /// Assigns or clears an account label on the backend.
    async fn set_label(&self, address: &Address, label: Option<&str>) -> Result<()>;

    /// Deploys a compiled contract.
    async fn deploy(&self, request: &DeployRequest) -> Result<TransactOutcome>;

    /// Executes a read-only call.
    async fn call(&self, request: &CallRequest) -> Result<TransactOutcome>;

    /// Executes a state-changing transaction.
    async fn transact(&self, request: &CallRequest) -> Result<TransactOutcome>;

    /// Dumps the authoritative chain state.
    async fn dump_state(&self) -> Result<NetworkDump>;

    /// Loads a previously-dumped chain state into the backend.
    async fn load_state(&self, dump: &NetworkDump) -> Result<()>;

    /// Fetches the ABI (and proxy implementation chain) of an on-chain
    /// contract.
    async fn get_abi(&self, address: &Address) -> Result<OnchainContract>;

    /// Liveness probe.
    async fn ping(&self) -> Result<bool>;
}
