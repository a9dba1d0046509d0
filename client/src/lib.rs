//! Programmatic client for the herald messaging protocol.
//!
//! Drives the full wire exchange over one `TcpStream`: handshake,
//! login/register, presence queries, sends, and incoming server events.
//! The server's integration tests use this crate as their test harness.

use std::{error::Error, fmt};

use herald_lib::protocol::{
    AuthMode, HELLO_TOKEN, ProtocolError, ResultCode, ServerEvent, read_hello, read_result,
    read_server_event, write_auth_request, write_hello, write_presence_query, write_send,
};
use tokio::net::{TcpStream, ToSocketAddrs};

pub mod app;

#[derive(Debug)]
pub enum ClientError {
    Protocol(ProtocolError),
    HandshakeMismatch(u32),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Protocol(err) => write!(f, "protocol error: {}", err),
            ClientError::HandshakeMismatch(token) => {
                write!(f, "server sent unexpected handshake token {:#010x}", token)
            }
        }
    }
}

impl Error for ClientError {}

impl From<ProtocolError> for ClientError {
    fn from(value: ProtocolError) -> Self {
        ClientError::Protocol(value)
    }
}

impl From<std::io::Error> for ClientError {
    fn from(value: std::io::Error) -> Self {
        ClientError::Protocol(ProtocolError::Io(value))
    }
}

pub struct Client {
    stream: TcpStream,
}

impl Client {
    /// Connects and completes the handshake: the server speaks first, the
    /// client echoes the token back.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let mut stream = TcpStream::connect(addr).await?;
        let token = read_hello(&mut stream).await?;
        if token != HELLO_TOKEN {
            return Err(ClientError::HandshakeMismatch(token));
        }
        write_hello(&mut stream).await?;
        Ok(Self { stream })
    }

    pub async fn register(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<ResultCode, ClientError> {
        self.authenticate(AuthMode::Register, username, password)
            .await
    }

    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<ResultCode, ClientError> {
        self.authenticate(AuthMode::Login, username, password).await
    }

    async fn authenticate(
        &mut self,
        mode: AuthMode,
        username: &str,
        password: &str,
    ) -> Result<ResultCode, ClientError> {
        write_auth_request(&mut self.stream, mode, username, password).await?;
        Ok(read_result(&mut self.stream).await?)
    }

    /// Fires a presence query without waiting for the reply; pair with
    /// [`Client::next_event`].
    pub async fn query_presence(&mut self, username: &str) -> Result<(), ClientError> {
        write_presence_query(&mut self.stream, username).await?;
        Ok(())
    }

    /// Queries presence and waits for the matching reply, discarding any
    /// unrelated events that arrive first. Use [`Client::next_event`] when
    /// interleaved deliveries matter.
    pub async fn is_available(&mut self, username: &str) -> Result<bool, ClientError> {
        self.query_presence(username).await?;
        loop {
            if let ServerEvent::Presence {
                username: echoed,
                online,
            } = self.next_event().await?
                && echoed == username
            {
                return Ok(online);
            }
        }
    }

    /// Relays a message toward `to`. The server drops it silently if the
    /// recipient is offline or unknown.
    pub async fn send_message(&mut self, to: &str, body: &str) -> Result<(), ClientError> {
        write_send(&mut self.stream, to, body).await?;
        Ok(())
    }

    /// Waits for the next server-originated event: a presence reply or a
    /// delivered message.
    pub async fn next_event(&mut self) -> Result<ServerEvent, ClientError> {
        Ok(read_server_event(&mut self.stream).await?)
    }

    /// Hands the underlying stream back, e.g. to split reading and writing
    /// across tasks once authenticated.
    pub fn into_inner(self) -> TcpStream {
        self.stream
    }
}
