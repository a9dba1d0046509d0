use std::net::SocketAddr;

use herald_lib::{
    credential::Credential,
    protocol::{
        AuthMode, AuthRequest, HELLO_TOKEN, MAX_PASSWORD_BYTES, MAX_USERNAME_BYTES, Opcode,
        ProtocolError, ResultCode, read_hello, read_text, write_hello, write_message,
        write_presence, write_result,
    },
};
use tokio::{
    io::AsyncReadExt,
    net::TcpStream,
    sync::mpsc::Receiver,
};
use tracing::{debug, info, warn};

use crate::{
    state::ServerState,
    store::{LoginError, Outbound, SessionHandle},
};

/// Drives one connection from dispatch to terminal cleanup.
///
/// The whole state machine races against the session's force-close signal,
/// so a superseding login or server shutdown tears the session down even
/// while it is blocked on peer I/O. Cleanup runs exactly once on every
/// exit path.
pub(crate) async fn serve(
    stream: TcpStream,
    state: ServerState,
    handle: SessionHandle,
    outbound: Receiver<Outbound>,
) {
    let peer = match stream.peer_addr() {
        Ok(peer) => peer,
        Err(err) => {
            warn!("session {} lost before setup: {}", handle.id.0, err);
            state.registry.remove(handle.id).await;
            return;
        }
    };
    info!("new connection from {} (session_id={})", peer, handle.id.0);

    let mut session = Session {
        stream,
        peer,
        state: state.clone(),
        handle: handle.clone(),
        outbound,
        username: None,
    };

    tokio::select! {
        _ = handle.close.notified() => {
            info!("session {} from {} force-closed", handle.id.0, peer);
        }
        result = session.run() => {
            if let Err(err) = result {
                warn!("session {} from {} failed: {}", handle.id.0, peer, err);
            }
        }
    }

    if let Some(username) = session.username.take() {
        state.store.clear_online_if_current(&username, handle.id).await;
        info!("({}) user logged out", username);
    }
    state.registry.remove(handle.id).await;
    info!(
        "connection from {} closed ({} sessions live)",
        peer,
        state.registry.len().await
    );
}

struct Session {
    stream: TcpStream,
    peer: SocketAddr,
    state: ServerState,
    handle: SessionHandle,
    outbound: Receiver<Outbound>,
    username: Option<String>,
}

impl Session {
    async fn run(&mut self) -> Result<(), ProtocolError> {
        if !self.handshake().await? {
            return Ok(());
        }
        let Some(username) = self.authenticate().await? else {
            return Ok(());
        };
        self.username = Some(username.clone());
        info!("({}) user logged in (session_id={})", username, self.handle.id.0);
        self.serve_loop(&username).await
    }

    /// Both ends must present the fixed token before any credentials move.
    /// A mismatch closes the connection with no further protocol traffic.
    async fn handshake(&mut self) -> Result<bool, ProtocolError> {
        write_hello(&mut self.stream).await?;
        let token = read_hello(&mut self.stream).await?;
        if token != HELLO_TOKEN {
            warn!("handshake mismatch from {}: got {:#010x}", self.peer, token);
            return Ok(false);
        }
        Ok(true)
    }

    /// Runs the login/register exchange. Returns the authenticated username,
    /// or `None` when the session was rejected and must close.
    async fn authenticate(&mut self) -> Result<Option<String>, ProtocolError> {
        let request = AuthRequest::read(&mut self.stream).await?;

        // Length limits come first, before any store lookup and before the
        // mode byte is interpreted.
        if request.username.len() > MAX_USERNAME_BYTES {
            write_result(&mut self.stream, ResultCode::UsernameTooLong).await?;
            return Ok(None);
        }
        if request.password.len() > MAX_PASSWORD_BYTES {
            write_result(&mut self.stream, ResultCode::PasswordTooLong).await?;
            return Ok(None);
        }

        match AuthMode::from_u8(request.mode) {
            Some(AuthMode::Register) => {
                let registered = self
                    .state
                    .store
                    .try_register(
                        &request.username,
                        Credential::new(request.password),
                        self.handle.clone(),
                    )
                    .await;
                if !registered {
                    write_result(&mut self.stream, ResultCode::AlreadyExists).await?;
                    return Ok(None);
                }
                info!("({}) registered new user", request.username);
            }
            Some(AuthMode::Login) => {
                let login = self
                    .state
                    .store
                    .login(&request.username, &request.password, self.handle.clone())
                    .await;
                match login {
                    Ok(superseded) => {
                        if let Some(previous) = superseded {
                            info!(
                                "({}) login supersedes session {}",
                                request.username, previous.id.0
                            );
                            previous.close.notify_one();
                        }
                    }
                    Err(LoginError::UnknownUser) => {
                        write_result(&mut self.stream, ResultCode::UnknownUser).await?;
                        return Ok(None);
                    }
                    Err(LoginError::WrongPassword) => {
                        write_result(&mut self.stream, ResultCode::WrongPassword).await?;
                        return Ok(None);
                    }
                }
            }
            None => {
                warn!("invalid auth mode {} from {}", request.mode, self.peer);
                return Ok(None);
            }
        }

        write_result(&mut self.stream, ResultCode::Ok).await?;
        Ok(Some(request.username))
    }

    /// Serves requests until the peer disconnects or the queue closes.
    ///
    /// This task is the only writer on the stream: presence replies are
    /// written inline and deliveries from other sessions arrive through the
    /// outbound queue, so concurrent senders can never interleave bytes on
    /// this connection. The opcode read is a single byte and therefore
    /// cancel-safe inside the select.
    async fn serve_loop(&mut self, username: &str) -> Result<(), ProtocolError> {
        let (mut reader, mut writer) = self.stream.split();
        loop {
            tokio::select! {
                delivery = self.outbound.recv() => {
                    match delivery {
                        Some(Outbound::Message { from, body }) => {
                            write_message(&mut writer, &from, &body).await?;
                        }
                        None => return Ok(()),
                    }
                }
                opcode = reader.read_u8() => {
                    let Ok(opcode) = opcode else {
                        // Peer disconnected or the transport failed; the
                        // session just ends.
                        return Ok(());
                    };
                    match Opcode::from_u8(opcode) {
                        Some(Opcode::IsAvailable) => {
                            let who = read_text(&mut reader).await?;
                            let online = self.state.store.is_online(&who).await;
                            write_presence(&mut writer, &who, online).await?;
                        }
                        Some(Opcode::Send) => {
                            let to = read_text(&mut reader).await?;
                            let body = read_text(&mut reader).await?;
                            match self.state.store.delivery_handle(&to).await {
                                Some(target) => {
                                    let delivery = Outbound::Message {
                                        from: username.to_owned(),
                                        body,
                                    };
                                    if target.outbound.try_send(delivery).is_err() {
                                        debug!(
                                            "({} -> {}) message dropped: queue unavailable",
                                            username, to
                                        );
                                    } else {
                                        info!("({} -> {}) message relayed", username, to);
                                    }
                                }
                                None => {
                                    debug!(
                                        "({} -> {}) message dropped: recipient offline",
                                        username, to
                                    );
                                }
                            }
                        }
                        // Unknown opcodes are a forward-compatible no-op;
                        // a client echoing `Received` gets the same.
                        Some(Opcode::Received) | None => {
                            debug!("({}) ignoring opcode {}", username, opcode);
                        }
                    }
                }
            }
        }
    }
}
