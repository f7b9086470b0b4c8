//! Session registry.
//!
//! Tracks every session and enforces the single-active-session invariant:
//! at most one session is mirrored to the UI at any time, and the active
//! session can never be removed without being deselected first. The
//! registry is itself observable through its session-list store, so the
//! bridge's chain-list view reacts to membership changes like any other
//! state concern.

use crate::error::{Result, SakeError};
use crate::session::instance::Session;
use crate::session::model::SessionInfo;
use crate::store::StateStore;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Hook invoked when the active session changes.
///
/// The bridge implements this to move its store subscriptions from the
/// deactivated session to the activated one and push a full state update.
pub trait SessionObserver: Send + Sync {
    fn session_activated(&self, session: &Arc<Session>);
    fn session_deactivated(&self, session: &Arc<Session>);
}

/// Registry of all sessions with single-active selection.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    active_id: RwLock<Option<String>>,
    list: StateStore<Vec<SessionInfo>>,
    observer: RwLock<Option<Arc<dyn SessionObserver>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            active_id: RwLock::new(None),
            list: StateStore::new(Vec::new()),
            observer: RwLock::new(None),
        }
    }

    /// Installs the activation observer. Intended to be called once by the
    /// bridge during wiring.
    pub fn set_observer(&self, observer: Arc<dyn SessionObserver>) {
        *self.observer.write().expect("observer lock poisoned") = Some(observer);
    }

    /// Registers a session. Does not activate it.
    pub fn add(&self, session: Arc<Session>) -> Result<()> {
        {
            let mut sessions = self.sessions.write().expect("sessions lock poisoned");
            if sessions.contains_key(session.id()) {
                return Err(SakeError::registry(format!(
                    "session id already registered: {}",
                    session.id()
                )));
            }
            sessions.insert(session.id().to_string(), session);
        }
        self.refresh();
        Ok(())
    }

    /// Removes a session.
    ///
    /// Fails while the session is active: destructive removal of the
    /// current session would leave the bridge referencing a torn-down
    /// session, so callers must deselect first.
    pub fn remove(&self, id: &str) -> Result<Arc<Session>> {
        if self.active_id().as_deref() == Some(id) {
            return Err(SakeError::registry(
                "cannot remove the active session; deselect it first",
            ));
        }
        let removed = {
            let mut sessions = self.sessions.write().expect("sessions lock poisoned");
            sessions
                .remove(id)
                .ok_or_else(|| SakeError::registry(format!("unknown session: {id}")))?
        };
        self.refresh();
        Ok(removed)
    }

    /// Makes `id` the active session.
    ///
    /// No-op when already selected. Otherwise the previous session is
    /// deactivated first, then the new one activated, so the observer can
    /// unhook stale subscriptions before wiring new ones and pushing a
    /// full state update.
    pub fn select(&self, id: &str) -> Result<()> {
        if self.active_id().as_deref() == Some(id) {
            return Ok(());
        }
        let session = self
            .get(id)
            .ok_or_else(|| SakeError::registry(format!("unknown session: {id}")))?;

        let previous = {
            let mut active = self.active_id.write().expect("active lock poisoned");
            std::mem::replace(&mut *active, Some(id.to_string()))
        };
        let observer = self.observer();

        if let Some(previous_id) = previous {
            if let Some(previous_session) = self.get(&previous_id) {
                previous_session.on_deactivate();
                if let Some(observer) = &observer {
                    observer.session_deactivated(&previous_session);
                }
            }
        }

        session.on_activate();
        if let Some(observer) = &observer {
            observer.session_activated(&session);
        }

        tracing::info!(target: "sake::registry", id, "session selected");
        self.refresh();
        Ok(())
    }

    /// Clears the active selection. Zero active sessions is a valid state.
    pub fn deselect(&self) {
        let previous = {
            let mut active = self.active_id.write().expect("active lock poisoned");
            active.take()
        };
        if let Some(previous_id) = previous {
            if let Some(session) = self.get(&previous_id) {
                session.on_deactivate();
                if let Some(observer) = &self.observer() {
                    observer.session_deactivated(&session);
                }
            }
            self.refresh();
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions
            .read()
            .expect("sessions lock poisoned")
            .get(id)
            .cloned()
    }

    pub fn active_id(&self) -> Option<String> {
        self.active_id.read().expect("active lock poisoned").clone()
    }

    pub fn active(&self) -> Option<Arc<Session>> {
        self.active_id().and_then(|id| self.get(&id))
    }

    /// All registered sessions, in no particular order.
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.sessions
            .read()
            .expect("sessions lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Observable list view consumed by the bridge's chain-list connector.
    pub fn list_store(&self) -> &StateStore<Vec<SessionInfo>> {
        &self.list
    }

    /// Rebuilds the list view. Called after every membership or selection
    /// change, and by callers whose operations changed a session's
    /// connected flag.
    pub fn refresh(&self) {
        let mut infos: Vec<SessionInfo> = self
            .sessions
            .read()
            .expect("sessions lock poisoned")
            .values()
            .map(|s| s.info())
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        self.list.set(infos);
    }

    fn observer(&self) -> Option<Arc<dyn SessionObserver>> {
        self.observer.read().expect("observer lock poisoned").clone()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
