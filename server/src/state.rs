use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::{registry::Registry, store::AccountStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SessionId(pub(crate) u64);

#[derive(Clone)]
pub(crate) struct ServerState {
    pub(crate) store: AccountStore,
    pub(crate) registry: Registry,
    sessions: Arc<AtomicU64>,
}

impl ServerState {
    pub(crate) fn new(store: AccountStore) -> Self {
        Self {
            store,
            registry: Registry::default(),
            sessions: Arc::new(AtomicU64::new(1)),
        }
    }

    pub(crate) fn next_session_id(&self) -> SessionId {
        SessionId(self.sessions.fetch_add(1, Ordering::Relaxed))
    }
}
