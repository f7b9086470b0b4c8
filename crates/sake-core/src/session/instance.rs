//! The live session object.
//!
//! A `Session` owns one network adapter, one set of observable stores and
//! its persistence bookkeeping. High-level operations combine exactly one
//! adapter call with the matching store update: on adapter failure the
//! error is rethrown and no store mutation happens. The backend remains
//! the source of truth for chain state; the session mirrors it.

use crate::account::{Account, Address};
use crate::adapter::{CallRequest, DeployRequest, NetworkAdapter, NetworkConfig, TransactOutcome};
use crate::contract::DeployedContract;
use crate::error::{Result, SakeError};
use crate::fingerprint::fingerprint;
use crate::notice::{Notice, NoticeSink};
use crate::session::model::{
    PersistenceMeta, SessionInfo, SessionKind, SessionSnapshot, StateSubset,
};
use crate::session::state::SessionState;
use crate::transaction::TransactionRecord;
use primitive_types::U256;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

struct Meta {
    display_name: String,
    network: NetworkConfig,
    connected: bool,
}

/// One independent chain sandbox session.
pub struct Session {
    id: String,
    kind: SessionKind,
    adapter: Arc<dyn NetworkAdapter>,
    state: SessionState,
    meta: RwLock<Meta>,
    persistence: RwLock<PersistenceMeta>,
    active: AtomicBool,
    notices: NoticeSink,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a disconnected session. Call [`Session::connect`] (or
    /// [`Session::connect_from_snapshot`]) before issuing operations.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        kind: SessionKind,
        network: NetworkConfig,
        adapter: Arc<dyn NetworkAdapter>,
        notices: NoticeSink,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            adapter,
            state: SessionState::new(),
            meta: RwLock::new(Meta {
                display_name: display_name.into(),
                network,
                connected: false,
            }),
            persistence: RwLock::new(PersistenceMeta::default()),
            active: AtomicBool::new(false),
            notices,
        }
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn display_name(&self) -> String {
        self.meta.read().expect("meta lock poisoned").display_name.clone()
    }

    pub fn set_display_name(&self, name: impl Into<String>) {
        self.meta.write().expect("meta lock poisoned").display_name = name.into();
        self.mark_dirty();
    }

    pub fn network(&self) -> NetworkConfig {
        self.meta.read().expect("meta lock poisoned").network.clone()
    }

    pub fn connected(&self) -> bool {
        self.meta.read().expect("meta lock poisoned").connected
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn info(&self) -> SessionInfo {
        let meta = self.meta.read().expect("meta lock poisoned");
        SessionInfo {
            id: self.id.clone(),
            display_name: meta.display_name.clone(),
            kind: self.kind,
            connected: meta.connected,
        }
    }

    // ============================================================================
    // Persistence bookkeeping
    // ============================================================================

    pub fn persistence(&self) -> PersistenceMeta {
        self.persistence.read().expect("persistence lock poisoned").clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.persistence().is_dirty
    }

    pub fn set_autosave(&self, enabled: bool) {
        let mut meta = self.persistence.write().expect("persistence lock poisoned");
        meta.is_autosave_enabled = enabled;
    }

    /// Marks unsaved state. Called by every successful mutating operation.
    pub fn mark_dirty(&self) {
        let mut meta = self.persistence.write().expect("persistence lock poisoned");
        meta.is_dirty = true;
    }

    /// Records a completed save: clears dirty, stamps the save time.
    pub fn mark_saved(&self, timestamp: i64) {
        let mut meta = self.persistence.write().expect("persistence lock poisoned");
        meta.is_dirty = false;
        meta.last_save_timestamp = Some(timestamp);
    }

    // ============================================================================
    // Lifecycle
    // ============================================================================

    /// Brings up this session's chain and populates the account store.
    pub async fn connect(&self) -> Result<()> {
        if self.connected() {
            return Err(SakeError::validation("session is already connected"));
        }

        let info = self.bring_up_chain().await?;
        self.set_connected(true);
        self.set_assigned_uri(info.uri);

        let accounts = self.fetch_accounts(info.accounts).await?;
        self.state.accounts.set(accounts);

        tracing::info!(target: "sake::session", id = %self.id, "session connected");
        Ok(())
    }

    /// Connects, then restores the persisted snapshot instead of starting
    /// from the backend's fresh state.
    ///
    /// The chain dump is pushed back into the backend and the stores are
    /// replaced with the snapshot's contents; connecting does not reset
    /// restored state.
    pub async fn connect_from_snapshot(&self, snapshot: &SessionSnapshot) -> Result<()> {
        if self.connected() {
            return Err(SakeError::validation("session is already connected"));
        }

        let info = self.bring_up_chain().await?;
        self.set_connected(true);
        self.set_assigned_uri(info.uri);

        self.track(self.adapter.load_state(&snapshot.network).await)?;
        self.state.replace_all(
            snapshot.accounts.clone(),
            snapshot.deployments.clone(),
            snapshot.history.clone(),
        );
        {
            let mut meta = self.persistence.write().expect("persistence lock poisoned");
            *meta = snapshot.persistence.clone();
            meta.is_dirty = false;
        }

        tracing::info!(target: "sake::session", id = %self.id, "session restored from snapshot");
        Ok(())
    }

    /// Re-establishes the connection after a detected loss.
    ///
    /// Reconnection is never state-preserving: the stores are reset to the
    /// fresh chain's initial contents and the user is told that the
    /// previous state could not be recovered.
    pub async fn reconnect(&self) -> Result<()> {
        self.set_connected(false);
        self.state.reset();

        let info = self.bring_up_chain().await?;
        self.set_connected(true);
        self.set_assigned_uri(info.uri);

        let accounts = self.fetch_accounts(info.accounts).await?;
        self.state.accounts.set(accounts);
        self.mark_dirty();

        (self.notices)(Notice::warning(format!(
            "Session '{}' reconnected; previous chain state could not be recovered",
            self.display_name()
        )));
        tracing::warn!(target: "sake::session", id = %self.id, "session reconnected, state reset");
        Ok(())
    }

    /// Tears down the backend side of this session.
    pub async fn disconnect(&self) -> Result<()> {
        if self.connected() {
            self.track(self.adapter.disconnect().await)?;
            self.set_connected(false);
        }
        Ok(())
    }

    /// Liveness probe against the backend. A failed probe classifies like
    /// any other connection loss.
    pub async fn ping(&self) -> Result<bool> {
        let alive = self.track(self.adapter.ping().await)?;
        if !alive {
            self.set_connected(false);
        }
        Ok(alive)
    }

    // ============================================================================
    // Chain operations
    // ============================================================================

    /// Deploys a compiled contract.
    ///
    /// A reverted deployment still appends a history record; only the
    /// adapter call failing leaves all stores untouched.
    pub async fn deploy(&self, request: DeployRequest) -> Result<TransactOutcome> {
        let outcome = self.track(self.adapter.deploy(&request).await)?;

        if outcome.success {
            if let Some(address) = &outcome.contract_address {
                self.state.upsert_deployment(DeployedContract::from_artifact(
                    address.clone(),
                    request.name.clone(),
                    request.contract_fqn.clone(),
                    request.abi.clone(),
                ));
            }
        }
        self.state.push_record(TransactionRecord::Deployment {
            success: outcome.success,
            name: request.name.clone(),
            address: outcome.contract_address.clone(),
            receipt: outcome.receipt.clone(),
            call_trace: outcome.call_trace.clone(),
            error: outcome.error.clone(),
        });
        self.mark_dirty();
        Ok(outcome)
    }

    /// Executes a read-only call and records it in the history.
    pub async fn call(&self, request: CallRequest) -> Result<TransactOutcome> {
        let outcome = self.track(self.adapter.call(&request).await)?;
        self.record_function_call(&request, &outcome);
        self.mark_dirty();
        Ok(outcome)
    }

    /// Executes a state-changing transaction and records it.
    pub async fn transact(&self, request: CallRequest) -> Result<TransactOutcome> {
        let outcome = self.track(self.adapter.transact(&request).await)?;
        self.record_function_call(&request, &outcome);
        self.mark_dirty();
        Ok(outcome)
    }

    /// Overrides an account's balance on the backend and mirrors it.
    pub async fn set_account_balance(&self, address: &Address, balance: U256) -> Result<()> {
        self.track(self.adapter.set_balance(address, balance).await)?;
        self.state.upsert_balance(address, balance);
        self.mark_dirty();
        Ok(())
    }

    /// Assigns or clears an account nickname.
    pub async fn set_account_label(&self, address: &Address, label: Option<String>) -> Result<()> {
        self.track(self.adapter.set_label(address, label.as_deref()).await)?;
        self.state.set_nickname(address, label)?;
        self.mark_dirty();
        Ok(())
    }

    /// Discovers an on-chain contract by address: fetches its ABI and proxy
    /// implementation chain and records it in the deployment store.
    pub async fn fetch_onchain_contract(&self, address: &Address) -> Result<DeployedContract> {
        let found = self.track(self.adapter.get_abi(address).await)?;
        let contract = DeployedContract {
            address: found.address,
            name: found.name.unwrap_or_else(|| "Unknown".to_string()),
            fqn: None,
            abi: found.abi,
            balance: None,
            proxy_for: found.implementations,
        };
        self.state.upsert_deployment(contract.clone());
        self.mark_dirty();
        Ok(contract)
    }

    /// Removes one proxy implementation entry by id. Pure store operation.
    pub fn remove_proxy_implementation(&self, contract: &Address, impl_id: &str) -> Result<()> {
        self.state.remove_proxy_implementation(contract, impl_id)?;
        self.mark_dirty();
        Ok(())
    }

    /// Produces a complete snapshot: current store contents plus a fresh
    /// authoritative chain dump queried from the backend at call time.
    pub async fn dump_state(&self) -> Result<SessionSnapshot> {
        let network = self.track(self.adapter.dump_state().await)?;

        let accounts = self.state.accounts.get();
        let deployments = self.state.deployments.get();
        let history = self.state.history.get();
        let state_fingerprint = fingerprint(&StateSubset {
            accounts: &accounts,
            deployments: &deployments,
            history: &history,
        })?;

        Ok(SessionSnapshot {
            id: self.id.clone(),
            display_name: self.display_name(),
            kind: self.kind,
            accounts,
            deployments,
            history,
            network,
            state_fingerprint,
            persistence: self.persistence(),
        })
    }

    // ============================================================================
    // Activation
    // ============================================================================

    /// Marks this session as the one mirrored to the UI. Idempotent.
    pub fn on_activate(&self) {
        if !self.active.swap(true, Ordering::SeqCst) {
            tracing::debug!(target: "sake::session", id = %self.id, "activated");
        }
    }

    /// Clears the active mark. Idempotent and safe when never activated.
    pub fn on_deactivate(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            tracing::debug!(target: "sake::session", id = %self.id, "deactivated");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    // ============================================================================
    // Internals
    // ============================================================================

    async fn bring_up_chain(&self) -> Result<crate::adapter::ChainInfo> {
        let result = match self.kind {
            SessionKind::LocalNode => self.adapter.create_chain(&self.network()).await,
            SessionKind::Connection => {
                let uri = self.network().uri.ok_or_else(|| {
                    SakeError::validation("connection session requires a uri")
                })?;
                self.adapter.connect_chain(&uri).await
            }
        };
        self.track(result)
    }

    async fn fetch_accounts(&self, addresses: Vec<Address>) -> Result<Vec<Account>> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }
        let balances = self.track(self.adapter.get_balances(&addresses).await)?;
        Ok(balances
            .into_iter()
            .map(|(address, balance)| Account::new(address, balance))
            .collect())
    }

    fn record_function_call(&self, request: &CallRequest, outcome: &TransactOutcome) {
        self.state.push_record(TransactionRecord::FunctionCall {
            success: outcome.success,
            to: request.to.clone(),
            function: request.function.clone(),
            output: Some(crate::transaction::TxOutput {
                raw: outcome.return_value.clone(),
                decoded: outcome.decoded_return.clone(),
            }),
            receipt: outcome.receipt.clone(),
            call_trace: outcome.call_trace.clone(),
            error: outcome.error.clone(),
        });
    }

    fn set_connected(&self, connected: bool) {
        self.meta.write().expect("meta lock poisoned").connected = connected;
    }

    fn set_assigned_uri(&self, uri: Option<String>) {
        if let Some(uri) = uri {
            self.meta.write().expect("meta lock poisoned").network.uri = Some(uri);
        }
    }

    /// Observes an adapter result; connection loss flips `connected` as a
    /// side effect, independent of which operation triggered it.
    fn track<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(SakeError::ConnectionLost) = &result {
            self.set_connected(false);
            tracing::warn!(target: "sake::session", id = %self.id, "connection lost");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice;
    use crate::testing::StubAdapter;
    use serde_json::json;
    use std::sync::Mutex;

    fn local_session(adapter: StubAdapter) -> Session {
        local_session_with(Arc::new(adapter)).0
    }

    fn local_session_with(adapter: Arc<StubAdapter>) -> (Session, Arc<StubAdapter>) {
        let session = Session::new(
            "s1",
            "Local 1",
            SessionKind::LocalNode,
            NetworkConfig::default(),
            adapter.clone(),
            notice::null_sink(),
        );
        (session, adapter)
    }

    fn deploy_request() -> DeployRequest {
        DeployRequest {
            contract_fqn: "contracts/Token.sol:Token".to_string(),
            name: "Token".to_string(),
            abi: json!([]),
            sender: Address::new("0xa1"),
            calldata: "0x".to_string(),
            value: U256::zero(),
        }
    }

    #[tokio::test]
    async fn test_connect_populates_normalized_accounts() {
        let session = local_session(StubAdapter::new());
        session.connect().await.unwrap();

        assert!(session.connected());
        let accounts = session.state().accounts.get();
        assert_eq!(accounts.len(), 3);
        assert_eq!(accounts[0].address.as_str(), "0xa1");
        assert_eq!(accounts[0].balance, U256::from(1_000u64));
    }

    #[tokio::test]
    async fn test_connect_twice_fails() {
        let session = local_session(StubAdapter::new());
        session.connect().await.unwrap();
        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, SakeError::Validation(_)));
    }

    #[tokio::test]
    async fn test_deploy_updates_stores_and_marks_dirty() {
        let session = local_session(StubAdapter::new());
        session.connect().await.unwrap();
        assert!(!session.is_dirty());

        let outcome = session.deploy(deploy_request()).await.unwrap();
        assert!(outcome.success);

        let deployments = session.state().deployments.get();
        assert_eq!(deployments.len(), 1);
        assert_eq!(deployments[0].name, "Token");
        assert_eq!(deployments[0].address.as_str(), "0xc0ffee");

        let history = session.state().history.get();
        assert_eq!(history.len(), 1);
        assert!(history[0].success());
        assert!(session.is_dirty());
    }

    #[tokio::test]
    async fn test_reverted_deploy_records_history_but_no_deployment() {
        let mut adapter = StubAdapter::new();
        adapter.deploy_success = false;
        let session = local_session(adapter);
        session.connect().await.unwrap();

        let outcome = session.deploy(deploy_request()).await.unwrap();
        assert!(!outcome.success);
        assert!(session.state().deployments.get().is_empty());
        assert_eq!(session.state().history.get().len(), 1);
        assert!(!session.state().history.get()[0].success());
    }

    #[tokio::test]
    async fn test_adapter_failure_leaves_state_untouched() {
        // Failure at connect time: nothing populated, nothing dirty.
        let failing = local_session(StubAdapter::failing_with(SakeError::adapter("boom")));
        failing.connect().await.unwrap_err();
        assert!(failing.state().accounts.get().is_empty());
        assert!(!failing.is_dirty());

        // Failure on a mutating operation after a clean connect.
        let (session, adapter) = local_session_with(Arc::new(StubAdapter::new()));
        session.connect().await.unwrap();
        adapter.fail_next_with(SakeError::adapter("deploy exploded"));

        session.deploy(deploy_request()).await.unwrap_err();
        assert!(session.state().deployments.get().is_empty());
        assert!(session.state().history.get().is_empty());
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn test_connection_loss_flips_connected_flag() {
        let (session, adapter) = local_session_with(Arc::new(StubAdapter::new()));
        session.connect().await.unwrap();
        assert!(session.connected());

        // Script a connection loss on the next operation.
        adapter.fail_next_with(SakeError::ConnectionLost);
        let err = session
            .call(CallRequest {
                to: Address::new("0xaa"),
                sender: Address::new("0xa1"),
                function: "get()".to_string(),
                calldata: "0x".to_string(),
                value: U256::zero(),
            })
            .await
            .unwrap_err();
        assert!(err.is_connection_lost());
        assert!(!session.connected());
        // No record was appended for the failed call.
        assert!(session.state().history.get().is_empty());
    }

    #[tokio::test]
    async fn test_reconnect_resets_state_and_notifies() {
        let notices = Arc::new(Mutex::new(Vec::new()));
        let notices_clone = Arc::clone(&notices);
        let sink: NoticeSink = Arc::new(move |notice| {
            notices_clone.lock().unwrap().push(notice);
        });

        let session = Session::new(
            "s1",
            "Local 1",
            SessionKind::LocalNode,
            NetworkConfig::default(),
            Arc::new(StubAdapter::new()),
            sink,
        );
        session.connect().await.unwrap();
        session.deploy(deploy_request()).await.unwrap();
        assert_eq!(session.state().deployments.get().len(), 1);

        session.reconnect().await.unwrap();

        assert!(session.connected());
        assert!(session.state().deployments.get().is_empty());
        assert!(session.state().history.get().is_empty());
        // Accounts reflect the fresh chain, not the pre-loss state.
        assert_eq!(session.state().accounts.get().len(), 3);
        let notices = notices.lock().unwrap();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].message.contains("could not be recovered"));
    }

    #[tokio::test]
    async fn test_dump_state_fingerprint_matches_contents() {
        let session = local_session(StubAdapter::new());
        session.connect().await.unwrap();
        session.deploy(deploy_request()).await.unwrap();

        let snapshot = session.dump_state().await.unwrap();
        assert_eq!(snapshot.accounts.len(), 3);
        assert_eq!(snapshot.deployments.len(), 1);
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(
            snapshot.compute_fingerprint().unwrap(),
            snapshot.state_fingerprint
        );
    }

    #[tokio::test]
    async fn test_connect_from_snapshot_replays_stores() {
        let session = local_session(StubAdapter::new());
        session.connect().await.unwrap();
        session.deploy(deploy_request()).await.unwrap();
        let snapshot = session.dump_state().await.unwrap();

        let restored = local_session(StubAdapter::new());
        restored.connect_from_snapshot(&snapshot).await.unwrap();

        assert!(restored.connected());
        assert_eq!(restored.state().deployments.get().len(), 1);
        assert_eq!(restored.state().history.get().len(), 1);
        // Restored sessions start clean.
        assert!(!restored.is_dirty());
    }

    #[tokio::test]
    async fn test_set_account_label_round_trip() {
        let session = local_session(StubAdapter::new());
        session.connect().await.unwrap();

        session
            .set_account_label(&Address::new("0xA1"), Some("deployer".to_string()))
            .await
            .unwrap();
        let accounts = session.state().accounts.get();
        assert_eq!(accounts[0].nickname.as_deref(), Some("deployer"));
        assert!(session.is_dirty());
    }

    #[tokio::test]
    async fn test_activation_is_idempotent() {
        let session = local_session(StubAdapter::new());
        session.on_activate();
        session.on_activate();
        assert!(session.is_active());
        session.on_deactivate();
        session.on_deactivate();
        assert!(!session.is_active());
    }
}
