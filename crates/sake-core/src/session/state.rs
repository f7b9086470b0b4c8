//! Per-session observable state.
//!
//! One `SessionState` bundles the three stores a session owns. The shared
//! compiled-contract store is deliberately not here: compilation is a
//! workspace-wide concept and lives in one global store.

use crate::account::{Account, Address};
use crate::contract::DeployedContract;
use crate::error::{Result, SakeError};
use crate::store::StateStore;
use crate::transaction::TransactionRecord;
use primitive_types::U256;

/// The observable stores of one session.
pub struct SessionState {
    pub accounts: StateStore<Vec<Account>>,
    pub deployments: StateStore<Vec<DeployedContract>>,
    pub history: StateStore<Vec<TransactionRecord>>,
}

impl SessionState {
    /// Creates empty stores.
    pub fn new() -> Self {
        Self {
            accounts: StateStore::new(Vec::new()),
            deployments: StateStore::new(Vec::new()),
            history: StateStore::new(Vec::new()),
        }
    }

    /// Resets every store to its initial empty value.
    pub fn reset(&self) {
        self.accounts.set(Vec::new());
        self.deployments.set(Vec::new());
        self.history.set(Vec::new());
    }

    /// Replaces all store contents at once (persistence restore path).
    pub fn replace_all(
        &self,
        accounts: Vec<Account>,
        deployments: Vec<DeployedContract>,
        history: Vec<TransactionRecord>,
    ) {
        self.accounts.set(accounts);
        self.deployments.set(deployments);
        self.history.set(history);
    }

    /// Inserts or updates an account's balance, keyed by normalized address.
    pub fn upsert_balance(&self, address: &Address, balance: U256) {
        self.accounts.update(|accounts| {
            match accounts.iter_mut().find(|a| &a.address == address) {
                Some(account) => account.balance = balance,
                None => accounts.push(Account::new(address.clone(), balance)),
            }
        });
    }

    /// Sets or clears an account's nickname.
    ///
    /// Returns an error if the address is not in the store.
    pub fn set_nickname(&self, address: &Address, nickname: Option<String>) -> Result<()> {
        let mut found = false;
        self.accounts.update(|accounts| {
            if let Some(account) = accounts.iter_mut().find(|a| &a.address == address) {
                account.nickname = nickname;
                found = true;
            }
        });
        if found {
            Ok(())
        } else {
            Err(SakeError::not_found("account", address.as_str()))
        }
    }

    /// Inserts a deployed contract, replacing any previous entry at the
    /// same address.
    pub fn upsert_deployment(&self, contract: DeployedContract) {
        self.deployments.update(|deployments| {
            deployments.retain(|c| c.address != contract.address);
            deployments.push(contract);
        });
    }

    /// Appends a history record. Records are never mutated afterwards.
    pub fn push_record(&self, record: TransactionRecord) {
        self.history.update(|history| history.push(record));
    }

    /// Removes one proxy implementation entry by id.
    pub fn remove_proxy_implementation(&self, contract: &Address, impl_id: &str) -> Result<()> {
        let mut contract_found = false;
        let mut impl_found = false;
        self.deployments.update(|deployments| {
            if let Some(deployed) = deployments.iter_mut().find(|c| &c.address == contract) {
                contract_found = true;
                let before = deployed.proxy_for.len();
                deployed.proxy_for.retain(|imp| imp.id != impl_id);
                impl_found = deployed.proxy_for.len() < before;
            }
        });
        if !contract_found {
            return Err(SakeError::not_found("contract", contract.as_str()));
        }
        if !impl_found {
            return Err(SakeError::not_found("proxy implementation", impl_id));
        }
        Ok(())
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
