//! Test support.
//!
//! A scriptable in-memory [`NetworkAdapter`] used by this workspace's test
//! suites in place of a live backend. Not intended for production use.

use crate::account::Address;
use crate::adapter::{
    CallRequest, ChainInfo, DeployRequest, NetworkAdapter, NetworkConfig, NetworkDump,
    OnchainContract, TransactOutcome,
};
use crate::error::{Result, SakeError};
use async_trait::async_trait;
use primitive_types::U256;
use serde_json::json;
use std::sync::Mutex;

/// In-memory adapter with scriptable failures.
///
/// Every operation first consumes a failure scripted with
/// [`StubAdapter::fail_next_with`]; otherwise it succeeds with canned
/// data: three pre-funded accounts, deployments at a fixed address, calls
/// returning `0x01`.
pub struct StubAdapter {
    /// Addresses reported by `create_chain` / `connect_chain`
    pub accounts: Vec<&'static str>,
    /// Balance reported for every account
    pub balance: U256,
    /// Whether deploys succeed or revert
    pub deploy_success: bool,
    fail_next: Mutex<Option<SakeError>>,
}

impl StubAdapter {
    pub fn new() -> Self {
        Self {
            accounts: vec!["0xA1", "0xB2", "0xC3"],
            balance: U256::from(1_000u64),
            deploy_success: true,
            fail_next: Mutex::new(None),
        }
    }

    /// Creates an adapter whose next operation fails with `error`.
    pub fn failing_with(error: SakeError) -> Self {
        let adapter = Self::new();
        adapter.fail_next_with(error);
        adapter
    }

    /// Scripts the next operation to fail with `error`.
    pub fn fail_next_with(&self, error: SakeError) {
        *self.fail_next.lock().expect("stub lock poisoned") = Some(error);
    }

    fn take_failure(&self) -> Result<()> {
        match self.fail_next.lock().expect("stub lock poisoned").take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn chain_info(&self) -> ChainInfo {
        ChainInfo {
            uri: Some("http://127.0.0.1:8545".to_string()),
            accounts: self.accounts.iter().map(Address::new).collect(),
        }
    }
}

impl Default for StubAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkAdapter for StubAdapter {
    async fn create_chain(&self, _config: &NetworkConfig) -> Result<ChainInfo> {
        self.take_failure()?;
        Ok(self.chain_info())
    }

    async fn connect_chain(&self, _uri: &str) -> Result<ChainInfo> {
        self.take_failure()?;
        Ok(self.chain_info())
    }

    async fn disconnect(&self) -> Result<()> {
        self.take_failure()
    }

    async fn get_balances(&self, addresses: &[Address]) -> Result<Vec<(Address, U256)>> {
        self.take_failure()?;
        Ok(addresses
            .iter()
            .map(|a| (a.clone(), self.balance))
            .collect())
    }

    async fn set_balance(&self, _address: &Address, _balance: U256) -> Result<()> {
        self.take_failure()
    }

    async fn set_label(&self, _address: &Address, _label: Option<&str>) -> Result<()> {
        self.take_failure()
    }

    async fn deploy(&self, request: &DeployRequest) -> Result<TransactOutcome> {
        self.take_failure()?;
        Ok(TransactOutcome {
            success: self.deploy_success,
            contract_address: self.deploy_success.then(|| Address::new("0xC0FFEE")),
            return_value: "0x".to_string(),
            decoded_return: None,
            receipt: Some(json!({"from": request.sender.as_str()})),
            call_trace: None,
            error: (!self.deploy_success).then(|| "execution reverted".to_string()),
        })
    }

    async fn call(&self, _request: &CallRequest) -> Result<TransactOutcome> {
        self.take_failure()?;
        Ok(TransactOutcome {
            success: true,
            contract_address: None,
            return_value: "0x01".to_string(),
            decoded_return: Some(json!(true)),
            receipt: None,
            call_trace: None,
            error: None,
        })
    }

    async fn transact(&self, request: &CallRequest) -> Result<TransactOutcome> {
        self.call(request).await
    }

    async fn dump_state(&self) -> Result<NetworkDump> {
        self.take_failure()?;
        Ok(NetworkDump {
            raw: json!({"blocks": []}),
            config: NetworkConfig::default(),
        })
    }

    async fn load_state(&self, _dump: &NetworkDump) -> Result<()> {
        self.take_failure()
    }

    async fn get_abi(&self, address: &Address) -> Result<OnchainContract> {
        self.take_failure()?;
        Ok(OnchainContract {
            address: address.clone(),
            name: Some("Discovered".to_string()),
            abi: json!([]),
            implementations: Vec::new(),
        })
    }

    async fn ping(&self) -> Result<bool> {
        self.take_failure()?;
        Ok(true)
    }
}
