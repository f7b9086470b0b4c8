//! Application context.
//!
//! `SakeContext` is the one object wiring everything together: registry,
//! shared compiled-contract store, bridge, persistence and the adapter
//! factory. It is constructed once at process start and passed by
//! reference to every caller; tests construct isolated instances.
//!
//! Command handlers are expected to route every user-invoked operation
//! through [`SakeContext::report`], so a failure becomes a displayed
//! notice and a `None` result instead of an escaped error.

use crate::bridge::StateBridge;
use crate::transport::UiTransport;
use sake_core::CompiledContractStore;
use sake_core::adapter::{CallRequest, DeployRequest, NetworkAdapter, NetworkConfig, TransactOutcome};
use sake_core::account::Address;
use sake_core::contract::CompiledContract;
use sake_core::error::{Result, SakeError};
use sake_core::notice::{Notice, NoticeSink};
use sake_core::session::{Session, SessionKind, SessionRegistry};
use sake_core::store::StateStore;
use sake_network::{WakeAdapter, WakeClient};
use sake_storage::{PersistenceManager, SakePaths};
use primitive_types::U256;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// Creates one network adapter per session.
pub trait AdapterFactory: Send + Sync {
    fn create(&self, session_id: &str) -> Arc<dyn NetworkAdapter>;
}

/// Factory producing adapters multiplexed over one wake client.
pub struct WakeAdapterFactory {
    client: Arc<WakeClient>,
}

impl WakeAdapterFactory {
    pub fn new(client: Arc<WakeClient>) -> Self {
        Self { client }
    }
}

impl AdapterFactory for WakeAdapterFactory {
    fn create(&self, session_id: &str) -> Arc<dyn NetworkAdapter> {
        Arc::new(WakeAdapter::new(Arc::clone(&self.client), session_id))
    }
}

/// The process-wide orchestration context.
pub struct SakeContext {
    registry: Arc<SessionRegistry>,
    compiled: CompiledContractStore,
    bridge: Arc<StateBridge>,
    persistence: PersistenceManager,
    adapters: Arc<dyn AdapterFactory>,
    notices: NoticeSink,
    monitor_running: AtomicBool,
}

impl SakeContext {
    pub fn new(
        paths: &SakePaths,
        adapters: Arc<dyn AdapterFactory>,
        transport: Arc<dyn UiTransport>,
    ) -> Arc<Self> {
        let registry = Arc::new(SessionRegistry::new());
        let compiled: CompiledContractStore = StateStore::new(Vec::new());
        let bridge = StateBridge::new(Arc::clone(&registry), compiled.clone(), transport);
        let notices = bridge.notice_sink();

        Arc::new(Self {
            registry,
            compiled,
            bridge,
            persistence: PersistenceManager::new(paths),
            adapters,
            notices,
            monitor_running: AtomicBool::new(false),
        })
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn bridge(&self) -> &Arc<StateBridge> {
        &self.bridge
    }

    pub fn compiled_contracts(&self) -> &CompiledContractStore {
        &self.compiled
    }

    // ============================================================================
    // Session lifecycle
    // ============================================================================

    /// Creates, connects, registers and selects a new session.
    pub async fn create_session(
        &self,
        display_name: impl Into<String>,
        kind: SessionKind,
        network: NetworkConfig,
    ) -> Result<Arc<Session>> {
        let id = Uuid::new_v4().to_string();
        let adapter = self.adapters.create(&id);
        let session = Arc::new(Session::new(
            &id,
            display_name,
            kind,
            network,
            adapter,
            self.notices.clone(),
        ));

        session.connect().await?;
        self.registry.add(Arc::clone(&session))?;
        self.registry.select(&id)?;
        self.persist_shared().await;
        Ok(session)
    }

    /// Selects a session and remembers the choice across restarts.
    pub async fn select_session(&self, id: &str) -> Result<()> {
        self.registry.select(id)?;
        self.persist_shared().await;
        Ok(())
    }

    /// Deletes a session: deselects it if active, disconnects the backend,
    /// then removes it from registry and persisted state.
    pub async fn delete_session(&self, id: &str) -> Result<()> {
        let session = self
            .registry
            .get(id)
            .ok_or_else(|| SakeError::registry(format!("unknown session: {id}")))?;

        if self.registry.active_id().as_deref() == Some(id) {
            self.registry.deselect();
        }
        if let Err(err) = session.disconnect().await {
            // The backend may already be gone; deletion proceeds regardless.
            tracing::warn!(target: "sake::context", id, error = %err, "disconnect during delete failed");
        }
        self.registry.remove(id)?;
        self.persistence.remove_session(id).await?;
        self.persist_shared().await;
        Ok(())
    }

    /// Re-establishes a lost session. State is reset, never recovered.
    pub async fn reconnect_session(&self, id: &str) -> Result<()> {
        let session = self.require(id)?;
        let result = session.reconnect().await;
        self.registry.refresh();
        result
    }

    // ============================================================================
    // Persistence
    // ============================================================================

    /// Saves one session's state to the workspace document.
    pub async fn save_session(&self, id: &str) -> Result<i64> {
        let session = self.require(id)?;
        self.save_session_inner(&session).await
    }

    /// Enables or disables autosave for a session.
    ///
    /// Turning autosave off stops future automatic saves; it neither
    /// triggers a save nor clears dirty state.
    pub fn set_autosave(&self, id: &str, enabled: bool) -> Result<()> {
        self.require(id)?.set_autosave(enabled);
        Ok(())
    }

    /// Restores every persisted session on startup.
    ///
    /// A missing or unreadable document is reported to the user and leaves
    /// the context empty; it never fails startup. Returns how many
    /// sessions were restored.
    pub async fn load_sessions(&self) -> usize {
        let outcome = match self.persistence.load().await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(target: "sake::context", error = %err, "failed to load workspace state");
                (self.notices)(Notice::error(format!(
                    "Could not load saved sessions: {err}"
                )));
                return 0;
            }
        };
        for warning in outcome.warnings {
            (self.notices)(Notice::warning(warning));
        }

        self.compiled.set(outcome.state.compiled_contracts);

        let mut restored = 0;
        for snapshot in outcome.state.sessions {
            let adapter = self.adapters.create(&snapshot.id);
            let session = Arc::new(Session::new(
                &snapshot.id,
                snapshot.display_name.clone(),
                snapshot.kind,
                snapshot.network.config.clone(),
                adapter,
                self.notices.clone(),
            ));
            match session.connect_from_snapshot(&snapshot).await {
                Ok(()) => match self.registry.add(session) {
                    Ok(()) => restored += 1,
                    Err(err) => {
                        tracing::error!(target: "sake::context", id = %snapshot.id, error = %err, "failed to register restored session");
                    }
                },
                Err(err) => {
                    (self.notices)(Notice::error(format!(
                        "Could not restore session '{}': {err}",
                        snapshot.display_name
                    )));
                }
            }
        }

        if let Some(active) = outcome.state.active_session_id {
            if self.registry.get(&active).is_some() {
                let _ = self.registry.select(&active);
            }
        }

        tracing::info!(target: "sake::context", restored, "workspace state loaded");
        restored
    }

    /// Replaces the workspace-wide compiled contract set.
    pub async fn set_compiled_contracts(&self, contracts: Vec<CompiledContract>) {
        self.compiled.set(contracts);
        self.persist_shared().await;
    }

    // ============================================================================
    // Chain operations (against the active session)
    // ============================================================================

    pub async fn deploy(&self, request: DeployRequest) -> Result<TransactOutcome> {
        let session = self.active_session()?;
        let result = session.deploy(request).await;
        self.after_mutation(&session, result).await
    }

    pub async fn call(&self, request: CallRequest) -> Result<TransactOutcome> {
        let session = self.active_session()?;
        let result = session.call(request).await;
        self.after_mutation(&session, result).await
    }

    pub async fn transact(&self, request: CallRequest) -> Result<TransactOutcome> {
        let session = self.active_session()?;
        let result = session.transact(request).await;
        self.after_mutation(&session, result).await
    }

    pub async fn set_account_balance(&self, address: &Address, balance: U256) -> Result<()> {
        let session = self.active_session()?;
        let result = session.set_account_balance(address, balance).await;
        self.after_mutation(&session, result).await
    }

    pub async fn set_account_label(&self, address: &Address, label: Option<String>) -> Result<()> {
        let session = self.active_session()?;
        let result = session.set_account_label(address, label).await;
        self.after_mutation(&session, result).await
    }

    pub async fn fetch_onchain_contract(
        &self,
        address: &Address,
    ) -> Result<sake_core::contract::DeployedContract> {
        let session = self.active_session()?;
        let result = session.fetch_onchain_contract(address).await;
        self.after_mutation(&session, result).await
    }

    pub async fn remove_proxy_implementation(
        &self,
        contract: &Address,
        impl_id: &str,
    ) -> Result<()> {
        let session = self.active_session()?;
        let result = session.remove_proxy_implementation(contract, impl_id);
        self.after_mutation(&session, result).await
    }

    // ============================================================================
    // Error reporting
    // ============================================================================

    /// Outermost wrapper for user-invoked operations: a failure is logged,
    /// shown as a notice, and collapsed into `None`.
    pub fn report<T>(&self, operation: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::error!(target: "sake::context", operation, error = %err, "operation failed");
                (self.notices)(Notice::error(format!("{operation}: {err}")));
                None
            }
        }
    }

    // ============================================================================
    // Connection monitor
    // ============================================================================

    /// Starts the background liveness probe over all connected sessions.
    pub fn start_connection_monitor(self: &Arc<Self>, interval_secs: u64) {
        if self.monitor_running.swap(true, Ordering::SeqCst) {
            tracing::warn!(target: "sake::context", "connection monitor already running");
            return;
        }
        let context = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
            tracing::info!(target: "sake::context", interval_secs, "connection monitor started");
            loop {
                ticker.tick().await;
                context.check_connections().await;
            }
        });
    }

    /// One probe round. Sessions whose backend went away are flagged and
    /// surfaced; reconnecting is left to an explicit user action.
    pub async fn check_connections(&self) {
        for session in self.registry.sessions() {
            if !session.connected() {
                continue;
            }
            let alive = matches!(session.ping().await, Ok(true));
            if !alive {
                self.registry.refresh();
                (self.notices)(Notice::warning(format!(
                    "Lost connection to session '{}'",
                    session.display_name()
                )));
            }
        }
    }

    // ============================================================================
    // Internals
    // ============================================================================

    fn require(&self, id: &str) -> Result<Arc<Session>> {
        self.registry
            .get(id)
            .ok_or_else(|| SakeError::registry(format!("unknown session: {id}")))
    }

    fn active_session(&self) -> Result<Arc<Session>> {
        self.registry
            .active()
            .ok_or_else(|| SakeError::registry("no active session"))
    }

    async fn save_session_inner(&self, session: &Arc<Session>) -> Result<i64> {
        let snapshot = session.dump_state().await?;
        let timestamp = self.persistence.save_snapshot(snapshot).await?;
        session.mark_saved(timestamp);
        Ok(timestamp)
    }

    /// Applies the cross-cutting consequences of a session operation:
    /// autosave on success, surfacing on connection loss.
    async fn after_mutation<T>(&self, session: &Arc<Session>, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.maybe_autosave(session).await,
            Err(err) if err.is_connection_lost() => {
                self.registry.refresh();
                (self.notices)(Notice::error(format!(
                    "Session '{}' lost its backend connection",
                    session.display_name()
                )));
            }
            Err(_) => {}
        }
        result
    }

    async fn maybe_autosave(&self, session: &Arc<Session>) {
        let meta = session.persistence();
        if meta.is_autosave_enabled && meta.is_dirty {
            if let Err(err) = self.save_session_inner(session).await {
                tracing::error!(target: "sake::context", id = session.id(), error = %err, "autosave failed");
                (self.notices)(Notice::error(format!(
                    "Autosave failed for '{}': {err}",
                    session.display_name()
                )));
            }
        }
    }

    /// Best-effort write of the workspace-wide shared state.
    async fn persist_shared(&self) {
        let result = self
            .persistence
            .save_shared(self.registry.active_id(), self.compiled.get())
            .await;
        if let Err(err) = result {
            tracing::warn!(target: "sake::context", error = %err, "failed to persist shared state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{StateId, UiMessage};
    use crate::transport::ChannelTransport;
    use sake_core::notice::NoticeLevel;
    use sake_core::testing::StubAdapter;
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct StubFactory;

    impl AdapterFactory for StubFactory {
        fn create(&self, _session_id: &str) -> Arc<dyn NetworkAdapter> {
            Arc::new(StubAdapter::new())
        }
    }

    fn context(dir: &TempDir) -> (Arc<SakeContext>, UnboundedReceiver<UiMessage>) {
        let (transport, receiver) = ChannelTransport::new();
        let context = SakeContext::new(
            &SakePaths::new(dir.path()),
            Arc::new(StubFactory),
            Arc::new(transport),
        );
        (context, receiver)
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

    fn drain(receiver: &mut UnboundedReceiver<UiMessage>) -> Vec<UiMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = receiver.try_recv() {
            messages.push(message);
        }
        messages
    }

    fn updates_for(messages: &[UiMessage], wanted: StateId) -> Vec<Value> {
        messages
            .iter()
            .filter_map(|m| match m {
                UiMessage::StateUpdate { state_id, payload } if *state_id == wanted => {
                    Some(payload.clone())
                }
                _ => None,
            })
            .collect()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_full_session_lifecycle() {
        let dir = TempDir::new().unwrap();

        // Create S1: three pre-funded accounts, lowercase addresses.
        let (context, mut receiver) = context(&dir);
        let s1 = context
            .create_session("S1", SessionKind::LocalNode, NetworkConfig::default())
            .await
            .unwrap();
        let accounts = s1.state().accounts.get();
        assert_eq!(accounts.len(), 3);
        assert!(accounts.iter().all(|a| a.address.as_str() == a.address.as_str().to_lowercase()));

        // Deploy: one deployment, one history record, dirty.
        context.deploy(deploy_request()).await.unwrap();
        assert_eq!(s1.state().deployments.get().len(), 1);
        assert_eq!(s1.state().deployments.get()[0].name, "Token");
        assert_eq!(s1.state().history.get().len(), 1);
        assert!(s1.is_dirty());

        // Save clears dirty.
        context.save_session(s1.id()).await.unwrap();
        assert!(!s1.is_dirty());
        let s1_id = s1.id().to_string();
        drain(&mut receiver);
        drop(context);

        // Simulated restart: a fresh context over the same workspace.
        let (context, mut receiver) = self::context(&dir);
        let restored = context.load_sessions().await;
        assert_eq!(restored, 1);

        let s1 = context.registry().get(&s1_id).unwrap();
        assert_eq!(s1.state().deployments.get().len(), 1);
        assert_eq!(s1.state().deployments.get()[0].name, "Token");
        assert_eq!(s1.state().history.get().len(), 1);
        // The previously active session is selected again.
        assert_eq!(context.registry().active_id().as_deref(), Some(s1_id.as_str()));
        drain(&mut receiver);

        // Creating S2 selects it and pushes S2's (empty) deployment state.
        let s2 = context
            .create_session("S2", SessionKind::LocalNode, NetworkConfig::default())
            .await
            .unwrap();
        let messages = drain(&mut receiver);
        let pushed = updates_for(&messages, StateId::Deployments);
        assert!(!pushed.is_empty());
        assert!(pushed.last().unwrap().as_array().unwrap().is_empty());

        // Selecting S1 again pushes its single deployment.
        context.select_session(s1.id()).await.unwrap();
        let messages = drain(&mut receiver);
        let pushed = updates_for(&messages, StateId::Deployments);
        assert_eq!(pushed.last().unwrap().as_array().unwrap().len(), 1);
        let _ = s2;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_autosave_persists_mutations() {
        let dir = TempDir::new().unwrap();
        let (context, _receiver) = context(&dir);
        let session = context
            .create_session("S1", SessionKind::LocalNode, NetworkConfig::default())
            .await
            .unwrap();
        context.set_autosave(session.id(), true).unwrap();

        context.deploy(deploy_request()).await.unwrap();
        // Autosave already ran; nothing left unsaved.
        assert!(!session.is_dirty());
        assert!(session.persistence().last_save_timestamp.is_some());
        let id = session.id().to_string();
        drop(context);

        let (context, _receiver) = self::context(&dir);
        assert_eq!(context.load_sessions().await, 1);
        let restored = context.registry().get(&id).unwrap();
        assert_eq!(restored.state().deployments.get().len(), 1);
        // The autosave flag survives the restart.
        assert!(restored.persistence().is_autosave_enabled);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_disabling_autosave_keeps_dirty_state() {
        let dir = TempDir::new().unwrap();
        let (context, _receiver) = context(&dir);
        let session = context
            .create_session("S1", SessionKind::LocalNode, NetworkConfig::default())
            .await
            .unwrap();

        context.deploy(deploy_request()).await.unwrap();
        assert!(session.is_dirty());

        context.set_autosave(session.id(), false).unwrap();
        // Toggling neither saved nor cleared anything.
        assert!(session.is_dirty());
        assert!(session.persistence().last_save_timestamp.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_save_timestamps_strictly_increase() {
        let dir = TempDir::new().unwrap();
        let (context, _receiver) = context(&dir);
        let session = context
            .create_session("S1", SessionKind::LocalNode, NetworkConfig::default())
            .await
            .unwrap();

        context.deploy(deploy_request()).await.unwrap();
        let first = context.save_session(session.id()).await.unwrap();
        context.deploy(deploy_request()).await.unwrap();
        let second = context.save_session(session.id()).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_active_session() {
        let dir = TempDir::new().unwrap();
        let (context, _receiver) = context(&dir);
        let session = context
            .create_session("S1", SessionKind::LocalNode, NetworkConfig::default())
            .await
            .unwrap();
        context.save_session(session.id()).await.unwrap();

        context.delete_session(session.id()).await.unwrap();
        assert!(context.registry().active().is_none());
        assert!(context.registry().sessions().is_empty());

        // The persisted record is gone too.
        let (context, _receiver) = self::context(&dir);
        assert_eq!(context.load_sessions().await, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_corrupt_state_file_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let paths = SakePaths::new(dir.path());
        std::fs::create_dir_all(paths.state_dir()).unwrap();
        std::fs::write(paths.state_file(), "{definitely not json").unwrap();

        let (context, mut receiver) = context(&dir);
        assert_eq!(context.load_sessions().await, 0);

        let messages = drain(&mut receiver);
        let errors: Vec<_> = messages
            .iter()
            .filter(|m| {
                matches!(
                    m,
                    UiMessage::Notice { notice } if notice.level == NoticeLevel::Error
                )
            })
            .collect();
        assert_eq!(errors.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_operations_without_active_session_fail() {
        let dir = TempDir::new().unwrap();
        let (context, mut receiver) = context(&dir);

        let result = context.deploy(deploy_request()).await;
        assert!(result.as_ref().unwrap_err().is_registry());

        // The report wrapper collapses the failure into a notice + None.
        assert!(context.report("Deploy contract", result).is_none());
        let messages = drain(&mut receiver);
        assert!(messages.iter().any(|m| matches!(
            m,
            UiMessage::Notice { notice } if notice.message.starts_with("Deploy contract")
        )));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reconnect_resets_and_notifies() {
        let dir = TempDir::new().unwrap();
        let (context, mut receiver) = context(&dir);
        let session = context
            .create_session("S1", SessionKind::LocalNode, NetworkConfig::default())
            .await
            .unwrap();
        context.deploy(deploy_request()).await.unwrap();
        drain(&mut receiver);

        context.reconnect_session(session.id()).await.unwrap();

        assert!(session.connected());
        assert!(session.state().deployments.get().is_empty());
        let messages = drain(&mut receiver);
        assert!(messages.iter().any(|m| matches!(
            m,
            UiMessage::Notice { notice } if notice.message.contains("could not be recovered")
        )));
    }
}
