//! State bridge.
//!
//! Relays "the active session's state changed" to the UI as tagged
//! envelopes, and serves on-demand state pulls against whatever session is
//! currently active. Per-session concerns re-subscribe on every session
//! switch; shared concerns (compiled contracts, the session list) are
//! connected once and unaffected by switching.

use crate::message::{StateId, UiMessage, UiRequest};
use crate::transport::UiTransport;
use sake_core::CompiledContractStore;
use sake_core::notice::NoticeSink;
use sake_core::session::{Session, SessionObserver, SessionRegistry};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Bridges the registry's active session to the UI transport.
pub struct StateBridge {
    transport: Arc<dyn UiTransport>,
    registry: Arc<SessionRegistry>,
    compiled: CompiledContractStore,
    /// Unsubscribe closures for the currently wired session. Emptied on
    /// deactivate so a stale session can never deliver again.
    active_subscriptions: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl StateBridge {
    /// Wires the bridge into the registry and the shared stores.
    ///
    /// The returned bridge is already installed as the registry's
    /// activation observer.
    pub fn new(
        registry: Arc<SessionRegistry>,
        compiled: CompiledContractStore,
        transport: Arc<dyn UiTransport>,
    ) -> Arc<Self> {
        let bridge = Arc::new(Self {
            transport,
            registry,
            compiled,
            active_subscriptions: Mutex::new(Vec::new()),
        });

        // Shared state: connected once, ignores session switches.
        {
            let transport = Arc::clone(&bridge.transport);
            let _ = bridge.compiled.subscribe(move |contracts| {
                send_update(transport.as_ref(), StateId::CompiledContracts, contracts);
            });
        }
        {
            let transport = Arc::clone(&bridge.transport);
            let _ = bridge.registry.list_store().subscribe(move |infos| {
                send_update(transport.as_ref(), StateId::Chains, infos);
            });
        }

        bridge
            .registry
            .set_observer(Arc::clone(&bridge) as Arc<dyn SessionObserver>);
        bridge
    }

    /// A sink that forwards notices to the UI as envelopes.
    pub fn notice_sink(self: &Arc<Self>) -> NoticeSink {
        let transport = Arc::clone(&self.transport);
        Arc::new(move |notice| transport.send(UiMessage::Notice { notice }))
    }

    /// Serves one request from the UI with a correlated reply.
    pub fn handle_request(&self, request: UiRequest) {
        match request {
            UiRequest::GetState {
                state_id,
                request_id,
            } => {
                tracing::debug!(target: "sake::bridge", state = %state_id, request = %request_id, "state pull");
                let payload = self.current_value(state_id);
                self.transport.send(UiMessage::Reply {
                    request_id,
                    payload,
                });
            }
        }
    }

    /// Pushes the full mirrored state for the active session.
    pub fn push_full_state(&self) {
        for state_id in [
            StateId::Accounts,
            StateId::Deployments,
            StateId::History,
            StateId::CompiledContracts,
            StateId::Chains,
        ] {
            let payload = self.current_value(state_id);
            self.transport.send(UiMessage::StateUpdate { state_id, payload });
        }
    }

    fn current_value(&self, state_id: StateId) -> Value {
        match state_id {
            StateId::Accounts => match self.registry.active() {
                Some(session) => to_payload(&session.state().accounts.get()),
                None => Value::Array(Vec::new()),
            },
            StateId::Deployments => match self.registry.active() {
                Some(session) => to_payload(&session.state().deployments.get()),
                None => Value::Array(Vec::new()),
            },
            StateId::History => match self.registry.active() {
                Some(session) => to_payload(&session.state().history.get()),
                None => Value::Array(Vec::new()),
            },
            StateId::CompiledContracts => to_payload(&self.compiled.get()),
            StateId::Chains => to_payload(&self.registry.list_store().get()),
        }
    }

    fn attach(&self, session: &Arc<Session>) {
        let mut subscriptions = self
            .active_subscriptions
            .lock()
            .expect("subscriptions lock poisoned");
        // Re-attaching is idempotent: stale wiring goes first.
        for unsubscribe in subscriptions.drain(..) {
            unsubscribe();
        }

        let state = session.state();
        {
            let transport = Arc::clone(&self.transport);
            let handle = state.accounts.subscribe(move |accounts| {
                send_update(transport.as_ref(), StateId::Accounts, accounts);
            });
            subscriptions.push(Box::new(move || handle.unsubscribe()));
        }
        {
            let transport = Arc::clone(&self.transport);
            let handle = state.deployments.subscribe(move |deployments| {
                send_update(transport.as_ref(), StateId::Deployments, deployments);
            });
            subscriptions.push(Box::new(move || handle.unsubscribe()));
        }
        {
            let transport = Arc::clone(&self.transport);
            let handle = state.history.subscribe(move |history| {
                send_update(transport.as_ref(), StateId::History, history);
            });
            subscriptions.push(Box::new(move || handle.unsubscribe()));
        }
        drop(subscriptions);

        // The switch must be visible without waiting for the next organic
        // mutation.
        send_update(
            self.transport.as_ref(),
            StateId::Accounts,
            &state.accounts.get(),
        );
        send_update(
            self.transport.as_ref(),
            StateId::Deployments,
            &state.deployments.get(),
        );
        send_update(
            self.transport.as_ref(),
            StateId::History,
            &state.history.get(),
        );
        tracing::debug!(target: "sake::bridge", id = session.id(), "connectors attached");
    }

    fn detach(&self) {
        let mut subscriptions = self
            .active_subscriptions
            .lock()
            .expect("subscriptions lock poisoned");
        for unsubscribe in subscriptions.drain(..) {
            unsubscribe();
        }
    }
}

impl SessionObserver for StateBridge {
    fn session_activated(&self, session: &Arc<Session>) {
        self.attach(session);
    }

    fn session_deactivated(&self, _session: &Arc<Session>) {
        self.detach();
    }
}

fn to_payload<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|err| {
        tracing::error!(target: "sake::bridge", error = %err, "failed to serialize state payload");
        Value::Null
    })
}

fn send_update<T: Serialize>(transport: &dyn UiTransport, state_id: StateId, value: &T) {
    transport.send(UiMessage::StateUpdate {
        state_id,
        payload: to_payload(value),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;
    use primitive_types::U256;
    use sake_core::account::Address;
    use sake_core::adapter::NetworkConfig;
    use sake_core::contract::CompiledContract;
    use sake_core::notice;
    use sake_core::session::SessionKind;
    use sake_core::store::StateStore;
    use sake_core::testing::StubAdapter;
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Fixture {
        registry: Arc<SessionRegistry>,
        compiled: CompiledContractStore,
        bridge: Arc<StateBridge>,
        receiver: UnboundedReceiver<UiMessage>,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(SessionRegistry::new());
        let compiled: CompiledContractStore = StateStore::new(Vec::new());
        let (transport, receiver) = ChannelTransport::new();
        let bridge = StateBridge::new(
            Arc::clone(&registry),
            compiled.clone(),
            Arc::new(transport),
        );
        Fixture {
            registry,
            compiled,
            bridge,
            receiver,
        }
    }

    fn session(id: &str) -> Arc<Session> {
        Arc::new(Session::new(
            id,
            format!("Session {id}"),
            SessionKind::LocalNode,
            NetworkConfig::default(),
            Arc::new(StubAdapter::new()),
            notice::null_sink(),
        ))
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

    #[tokio::test]
    async fn test_select_pushes_full_session_state() {
        let mut fx = fixture();
        let s1 = session("s1");
        s1.connect().await.unwrap();
        fx.registry.add(s1).unwrap();
        drain(&mut fx.receiver);

        fx.registry.select("s1").unwrap();

        let messages = drain(&mut fx.receiver);
        let accounts = updates_for(&messages, StateId::Accounts);
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].as_array().unwrap().len(), 3);
        assert_eq!(updates_for(&messages, StateId::Deployments).len(), 1);
        assert_eq!(updates_for(&messages, StateId::History).len(), 1);
    }

    #[tokio::test]
    async fn test_stale_session_never_delivers_after_switch() {
        let mut fx = fixture();
        let s1 = session("s1");
        let s2 = session("s2");
        s1.connect().await.unwrap();
        fx.registry.add(Arc::clone(&s1)).unwrap();
        fx.registry.add(s2).unwrap();

        fx.registry.select("s1").unwrap();
        fx.registry.select("s2").unwrap();
        drain(&mut fx.receiver);

        // Mutating the deselected session must not reach the UI.
        s1.state()
            .upsert_balance(&Address::new("0x99"), U256::from(1u64));
        let messages = drain(&mut fx.receiver);
        assert!(updates_for(&messages, StateId::Accounts).is_empty());
    }

    #[tokio::test]
    async fn test_switch_pushes_new_sessions_state_not_old() {
        let mut fx = fixture();
        let s1 = session("s1");
        let s2 = session("s2");
        s1.connect().await.unwrap();
        fx.registry.add(s1).unwrap();
        fx.registry.add(s2).unwrap();
        fx.registry.select("s1").unwrap();
        drain(&mut fx.receiver);

        // s2 was never connected, so its pushed state is empty.
        fx.registry.select("s2").unwrap();
        let messages = drain(&mut fx.receiver);
        let accounts = updates_for(&messages, StateId::Accounts);
        assert_eq!(accounts.len(), 1);
        assert!(accounts[0].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_active_session_mutations_stream_to_ui() {
        let mut fx = fixture();
        let s1 = session("s1");
        s1.connect().await.unwrap();
        fx.registry.add(Arc::clone(&s1)).unwrap();
        fx.registry.select("s1").unwrap();
        drain(&mut fx.receiver);

        s1.state()
            .upsert_balance(&Address::new("0xA1"), U256::from(42u64));

        let messages = drain(&mut fx.receiver);
        let accounts = updates_for(&messages, StateId::Accounts);
        assert_eq!(accounts.len(), 1);
        let first = &accounts[0].as_array().unwrap()[0];
        assert!(first["balance"].is_string());
    }

    #[tokio::test]
    async fn test_get_state_replies_with_correlation_id() {
        let mut fx = fixture();
        fx.bridge.handle_request(UiRequest::GetState {
            state_id: StateId::Accounts,
            request_id: "req-42".to_string(),
        });

        let messages = drain(&mut fx.receiver);
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            UiMessage::Reply {
                request_id,
                payload,
            } => {
                assert_eq!(request_id, "req-42");
                // No active session: empty list, not an error.
                assert!(payload.as_array().unwrap().is_empty());
            }
            other => panic!("expected reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_compiled_contracts_unaffected_by_switching() {
        let mut fx = fixture();
        let s1 = session("s1");
        let s2 = session("s2");
        fx.registry.add(s1).unwrap();
        fx.registry.add(s2).unwrap();
        fx.registry.select("s1").unwrap();
        fx.registry.select("s2").unwrap();
        drain(&mut fx.receiver);

        fx.compiled.set(vec![CompiledContract {
            fqn: "contracts/A.sol:A".to_string(),
            name: "A".to_string(),
            abi: json!([]),
            is_deployable: true,
        }]);

        let messages = drain(&mut fx.receiver);
        let compiled = updates_for(&messages, StateId::CompiledContracts);
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_session_list_streams_membership_changes() {
        let mut fx = fixture();
        fx.registry.add(session("s1")).unwrap();

        let messages = drain(&mut fx.receiver);
        let chains = updates_for(&messages, StateId::Chains);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0][0]["id"], "s1");
    }
}
