//! Concrete network adapter backed by the wake client.

use crate::client::{WakeClient, expect_data};
use crate::protocol::{BalanceEntry, WakeMethod};
use async_trait::async_trait;
use primitive_types::U256;
use sake_core::account::Address;
use sake_core::adapter::{
    CallRequest, ChainInfo, DeployRequest, NetworkAdapter, NetworkConfig, NetworkDump,
    OnchainContract, TransactOutcome,
};
use sake_core::error::Result;
use std::sync::Arc;

/// Network adapter for one session, multiplexed over a shared client.
pub struct WakeAdapter {
    client: Arc<WakeClient>,
    session_id: String,
}

impl WakeAdapter {
    pub fn new(client: Arc<WakeClient>, session_id: impl Into<String>) -> Self {
        Self {
            client,
            session_id: session_id.into(),
        }
    }
}

#[async_trait]
impl NetworkAdapter for WakeAdapter {
    async fn create_chain(&self, config: &NetworkConfig) -> Result<ChainInfo> {
        let data = self
            .client
            .request(
                &self.session_id,
                WakeMethod::CreateChain {
                    config: config.clone(),
                },
            )
            .await?;
        Ok(serde_json::from_value(expect_data(data, "create_chain")?)?)
    }

    async fn connect_chain(&self, uri: &str) -> Result<ChainInfo> {
        let data = self
            .client
            .request(
                &self.session_id,
                WakeMethod::ConnectChain {
                    uri: uri.to_string(),
                },
            )
            .await?;
        Ok(serde_json::from_value(expect_data(data, "connect_chain")?)?)
    }

    async fn disconnect(&self) -> Result<()> {
        self.client
            .request(&self.session_id, WakeMethod::DisconnectChain)
            .await?;
        Ok(())
    }

    async fn get_balances(&self, addresses: &[Address]) -> Result<Vec<(Address, U256)>> {
        let data = self
            .client
            .request(
                &self.session_id,
                WakeMethod::GetBalances {
                    addresses: addresses.to_vec(),
                },
            )
            .await?;
        let entries: Vec<BalanceEntry> =
            serde_json::from_value(expect_data(data, "get_balances")?)?;
        Ok(entries
            .into_iter()
            .map(|entry| (entry.address, entry.balance))
            .collect())
    }

    async fn set_balance(&self, address: &Address, balance: U256) -> Result<()> {
        self.client
            .request(
                &self.session_id,
                WakeMethod::SetBalance {
                    address: address.clone(),
                    balance,
                },
            )
            .await?;
        Ok(())
    }

    async fn set_label(&self, address: &Address, label: Option<&str>) -> Result<()> {
        self.client
            .request(
                &self.session_id,
                WakeMethod::SetLabel {
                    address: address.clone(),
                    label: label.map(str::to_string),
                },
            )
            .await?;
        Ok(())
    }

    async fn deploy(&self, request: &DeployRequest) -> Result<TransactOutcome> {
        let data = self
            .client
            .request(
                &self.session_id,
                WakeMethod::Deploy {
                    request: request.clone(),
                },
            )
            .await?;
        Ok(serde_json::from_value(expect_data(data, "deploy")?)?)
    }

    async fn call(&self, request: &CallRequest) -> Result<TransactOutcome> {
        let data = self
            .client
            .request(
                &self.session_id,
                WakeMethod::Call {
                    request: request.clone(),
                },
            )
            .await?;
        Ok(serde_json::from_value(expect_data(data, "call")?)?)
    }

    async fn transact(&self, request: &CallRequest) -> Result<TransactOutcome> {
        let data = self
            .client
            .request(
                &self.session_id,
                WakeMethod::Transact {
                    request: request.clone(),
                },
            )
            .await?;
        Ok(serde_json::from_value(expect_data(data, "transact")?)?)
    }

    async fn dump_state(&self) -> Result<NetworkDump> {
        let data = self
            .client
            .request(&self.session_id, WakeMethod::DumpState)
            .await?;
        Ok(serde_json::from_value(expect_data(data, "dump_state")?)?)
    }

    async fn load_state(&self, dump: &NetworkDump) -> Result<()> {
        self.client
            .request(
                &self.session_id,
                WakeMethod::LoadState { dump: dump.clone() },
            )
            .await?;
        Ok(())
    }

    async fn get_abi(&self, address: &Address) -> Result<OnchainContract> {
        let data = self
            .client
            .request(
                &self.session_id,
                WakeMethod::GetAbi {
                    address: address.clone(),
                },
            )
            .await?;
        Ok(serde_json::from_value(expect_data(data, "get_abi")?)?)
    }

    async fn ping(&self) -> Result<bool> {
        let data = self
            .client
            .request(&self.session_id, WakeMethod::Ping)
            .await?;
        Ok(data.as_bool().unwrap_or(true))
    }
}
