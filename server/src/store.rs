use std::{collections::HashMap, sync::Arc};

use herald_lib::credential::Credential;
use tokio::sync::{Notify, RwLock, mpsc::Sender};

use crate::{persist::AccountRecord, state::SessionId};

/// How another session reaches a live session: an outbound delivery queue
/// plus a force-close signal. Never the stream itself.
#[derive(Debug, Clone)]
pub(crate) struct SessionHandle {
    pub(crate) id: SessionId,
    pub(crate) outbound: Sender<Outbound>,
    pub(crate) close: Arc<Notify>,
}

#[derive(Debug)]
pub(crate) enum Outbound {
    Message { from: String, body: String },
}

struct Account {
    password: Credential,
    session: Option<SessionHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoginError {
    UnknownUser,
    WrongPassword,
}

/// The shared account directory.
///
/// One directory-level lock guards every account mutation and multi-field
/// read, with no I/O performed while it is held: delivery clones the
/// recipient's queue handle under the read lock and enqueues after
/// releasing it. The single lock totally orders contending critical
/// sections, so two sessions messaging each other concurrently cannot
/// deadlock.
#[derive(Clone, Default)]
pub struct AccountStore {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic check-and-insert. The new account comes up online, bound to
    /// the registering session. Returns `false` if the username is taken.
    pub(crate) async fn try_register(
        &self,
        username: &str,
        password: Credential,
        handle: SessionHandle,
    ) -> bool {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(username) {
            return false;
        }
        accounts.insert(
            username.to_owned(),
            Account {
                password,
                session: Some(handle),
            },
        );
        true
    }

    /// Verifies credentials and installs `handle` as the account's active
    /// session. Returns the superseded handle, if the account was already
    /// online, so the caller can force-close it.
    pub(crate) async fn login(
        &self,
        username: &str,
        candidate: &str,
        handle: SessionHandle,
    ) -> Result<Option<SessionHandle>, LoginError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(username).ok_or(LoginError::UnknownUser)?;
        if !account.password.verify(candidate) {
            return Err(LoginError::WrongPassword);
        }
        Ok(account.session.replace(handle))
    }

    /// Compare-and-clear: marks the account offline only while `session_id`
    /// is still its active session, so a late disconnect never undoes a
    /// newer login.
    pub(crate) async fn clear_online_if_current(&self, username: &str, session_id: SessionId) {
        let mut accounts = self.accounts.write().await;
        if let Some(account) = accounts.get_mut(username)
            && account.session.as_ref().is_some_and(|h| h.id == session_id)
        {
            account.session = None;
        }
    }

    pub(crate) async fn is_online(&self, username: &str) -> bool {
        let accounts = self.accounts.read().await;
        accounts
            .get(username)
            .is_some_and(|account| account.session.is_some())
    }

    /// Clones the active session's handle for delivery, if the account
    /// exists and is online.
    pub(crate) async fn delivery_handle(&self, username: &str) -> Option<SessionHandle> {
        let accounts = self.accounts.read().await;
        accounts.get(username)?.session.clone()
    }

    /// Replaces the directory contents with persisted records. Intended for
    /// the persistence collaborator before the accept loop starts.
    pub async fn bulk_load(&self, records: Vec<AccountRecord>) {
        let mut accounts = self.accounts.write().await;
        accounts.clear();
        for record in records {
            accounts.insert(
                record.username,
                Account {
                    password: Credential::new(record.password),
                    session: None,
                },
            );
        }
    }

    /// Consistent point-in-time view of all credentials, for persistence.
    pub async fn snapshot(&self) -> Vec<AccountRecord> {
        let accounts = self.accounts.read().await;
        accounts
            .iter()
            .map(|(username, account)| AccountRecord {
                username: username.clone(),
                password: account.password.expose().to_owned(),
            })
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use herald_lib::credential::Credential;
    use tokio::sync::{Notify, mpsc};

    use super::{AccountStore, LoginError, SessionHandle};
    use crate::{persist::AccountRecord, state::SessionId};

    fn handle(id: u64) -> SessionHandle {
        let (tx, _rx) = mpsc::channel(1);
        SessionHandle {
            id: SessionId(id),
            outbound: tx,
            close: Arc::new(Notify::new()),
        }
    }

    #[tokio::test]
    async fn register_is_atomic_per_username() {
        let store = AccountStore::new();
        assert!(
            store
                .try_register("ada", Credential::new("pw"), handle(1))
                .await
        );
        assert!(
            !store
                .try_register("ada", Credential::new("other"), handle(2))
                .await
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn login_checks_existence_then_password() {
        let store = AccountStore::new();
        assert!(
            store
                .try_register("ada", Credential::new("pw"), handle(1))
                .await
        );

        assert_eq!(
            store.login("ghost", "pw", handle(2)).await.unwrap_err(),
            LoginError::UnknownUser
        );
        assert_eq!(
            store.login("ada", "wrong", handle(2)).await.unwrap_err(),
            LoginError::WrongPassword
        );
    }

    #[tokio::test]
    async fn login_returns_superseded_session() {
        let store = AccountStore::new();
        assert!(
            store
                .try_register("ada", Credential::new("pw"), handle(1))
                .await
        );

        let previous = store.login("ada", "pw", handle(2)).await.unwrap();
        assert_eq!(previous.map(|h| h.id), Some(SessionId(1)));
        assert!(store.is_online("ada").await);
    }

    #[tokio::test]
    async fn stale_disconnect_does_not_clobber_newer_login() {
        let store = AccountStore::new();
        assert!(
            store
                .try_register("ada", Credential::new("pw"), handle(1))
                .await
        );
        store.login("ada", "pw", handle(2)).await.unwrap();

        // The superseded session's cleanup must be a no-op.
        store.clear_online_if_current("ada", SessionId(1)).await;
        assert!(store.is_online("ada").await);

        store.clear_online_if_current("ada", SessionId(2)).await;
        assert!(!store.is_online("ada").await);
    }

    #[tokio::test]
    async fn snapshot_reflects_bulk_loaded_records() {
        let store = AccountStore::new();
        store
            .bulk_load(vec![AccountRecord {
                username: "ada".into(),
                password: "pw".into(),
            }])
            .await;

        assert!(!store.is_online("ada").await);
        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].username, "ada");
        assert_eq!(snapshot[0].password, "pw");
    }
}
