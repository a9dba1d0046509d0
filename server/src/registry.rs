use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::{state::SessionId, store::SessionHandle};

/// The live set of sessions, authenticated or not.
///
/// Membership runs from dispatch to terminal cleanup and is used for
/// shutdown fan-out and counting only; delivery always routes through the
/// account store.
#[derive(Clone, Default)]
pub(crate) struct Registry {
    sessions: Arc<RwLock<HashMap<SessionId, SessionHandle>>>,
}

impl Registry {
    pub(crate) async fn insert(&self, handle: SessionHandle) {
        self.sessions.write().await.insert(handle.id, handle);
    }

    pub(crate) async fn remove(&self, id: SessionId) {
        self.sessions.write().await.remove(&id);
    }

    pub(crate) async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Signals every live session to close and returns how many were
    /// signalled. Each session runs its own cleanup independently.
    pub(crate) async fn close_all(&self) -> usize {
        let handles: Vec<SessionHandle> = self.sessions.read().await.values().cloned().collect();
        for handle in &handles {
            handle.close.notify_one();
        }
        handles.len()
    }
}
