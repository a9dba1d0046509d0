use std::{
    future::{Future, pending},
    sync::Arc,
    time::Duration,
};

use tokio::{
    net::TcpListener,
    sync::{Notify, mpsc},
    task::JoinSet,
    time::timeout,
};
use tracing::{error, info, warn};

use crate::{
    connection,
    error::BoxError,
    state::ServerState,
    store::{AccountStore, SessionHandle},
};

/// Per-session delivery queue depth. Senders never block on a recipient;
/// overflow drops the message instead.
const OUTBOUND_QUEUE: usize = 128;

/// How long shutdown waits for force-closed sessions to finish their own
/// cleanup before abandoning them.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(20);

pub async fn run(listener: TcpListener) -> Result<(), BoxError> {
    run_until(listener, pending::<()>(), AccountStore::new()).await
}

/// Accepts connections until `shutdown` resolves, then force-closes every
/// live session and drains them under a bounded window. The caller owns
/// `store` and can snapshot it for persistence after this returns.
pub async fn run_until(
    listener: TcpListener,
    shutdown: impl Future<Output = ()> + Send,
    store: AccountStore,
) -> Result<(), BoxError> {
    let local_addr = listener.local_addr()?;
    let state = ServerState::new(store);
    let mut sessions = JoinSet::new();
    tokio::pin!(shutdown);

    info!("server listening on {}", local_addr);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown signal received, stopping server accept loop");
                break;
            }
            Some(_) = sessions.join_next(), if !sessions.is_empty() => {}
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, _)) => {
                        let state = state.clone();
                        let id = state.next_session_id();
                        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);
                        let handle = SessionHandle {
                            id,
                            outbound: tx,
                            close: Arc::new(Notify::new()),
                        };
                        state.registry.insert(handle.clone()).await;
                        sessions.spawn(connection::serve(stream, state, handle, rx));
                    }
                    Err(err) => {
                        error!("accept error: {}", err);
                    }
                }
            }
        }
    }

    // Stop accepting before fanning out the close signal.
    drop(listener);
    let live = state.registry.close_all().await;
    if live > 0 {
        info!("force-closing {} live sessions", live);
    }

    let drain = async {
        while sessions.join_next().await.is_some() {}
    };
    if timeout(DRAIN_TIMEOUT, drain).await.is_err() {
        warn!(
            "drain window elapsed with {} sessions outstanding, aborting them",
            sessions.len()
        );
        sessions.shutdown().await;
    }

    Ok(())
}
