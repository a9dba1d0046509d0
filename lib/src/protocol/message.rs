use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::wire::{ProtocolError, read_flag, read_text, write_flag, write_text};

/// Fixed token exchanged in both directions before any credentials move.
pub const HELLO_TOKEN: u32 = 2012;

/// Usernames must be strictly shorter than 10 encoded bytes.
pub const MAX_USERNAME_BYTES: usize = 9;
/// Passwords must be strictly shorter than 20 encoded bytes.
pub const MAX_PASSWORD_BYTES: usize = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
}

impl AuthMode {
    pub fn as_u8(self) -> u8 {
        match self {
            AuthMode::Login => 1,
            AuthMode::Register => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(AuthMode::Login),
            2 => Some(AuthMode::Register),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Ok,
    UsernameTooLong,
    PasswordTooLong,
    AlreadyExists,
    UnknownUser,
    WrongPassword,
}

impl ResultCode {
    pub fn as_u8(self) -> u8 {
        match self {
            ResultCode::Ok => 0,
            ResultCode::UsernameTooLong => 3,
            ResultCode::PasswordTooLong => 4,
            ResultCode::AlreadyExists => 5,
            ResultCode::UnknownUser => 6,
            ResultCode::WrongPassword => 7,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ResultCode::Ok),
            3 => Some(ResultCode::UsernameTooLong),
            4 => Some(ResultCode::PasswordTooLong),
            5 => Some(ResultCode::AlreadyExists),
            6 => Some(ResultCode::UnknownUser),
            7 => Some(ResultCode::WrongPassword),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    IsAvailable,
    Send,
    Received,
}

impl Opcode {
    pub fn as_u8(self) -> u8 {
        match self {
            Opcode::IsAvailable => 8,
            Opcode::Send => 10,
            Opcode::Received => 11,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            8 => Some(Opcode::IsAvailable),
            10 => Some(Opcode::Send),
            11 => Some(Opcode::Received),
            _ => None,
        }
    }
}

/// Client credentials as read off the wire.
///
/// The mode byte stays raw so the server can run length validation before
/// deciding whether the mode itself is a protocol violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub mode: u8,
    pub username: String,
    pub password: String,
}

impl AuthRequest {
    pub async fn read<R>(reader: &mut R) -> Result<Self, ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let mode = reader.read_u8().await?;
        let username = read_text(reader).await?;
        let password = read_text(reader).await?;
        Ok(Self {
            mode,
            username,
            password,
        })
    }
}

/// A server-to-client message during serving: either a presence reply or a
/// relayed chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Presence { username: String, online: bool },
    Message { from: String, body: String },
}

pub async fn write_hello<W>(writer: &mut W) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u32(HELLO_TOKEN).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_hello<R>(reader: &mut R) -> Result<u32, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    Ok(reader.read_u32().await?)
}

pub async fn write_auth_request<W>(
    writer: &mut W,
    mode: AuthMode,
    username: &str,
    password: &str,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u8(mode.as_u8()).await?;
    write_text(writer, username).await?;
    write_text(writer, password).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn write_result<W>(writer: &mut W, code: ResultCode) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u8(code.as_u8()).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_result<R>(reader: &mut R) -> Result<ResultCode, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let raw = reader.read_u8().await?;
    ResultCode::from_u8(raw).ok_or(ProtocolError::UnknownResultCode(raw))
}

pub async fn write_presence_query<W>(writer: &mut W, username: &str) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u8(Opcode::IsAvailable.as_u8()).await?;
    write_text(writer, username).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn write_send<W>(writer: &mut W, to: &str, body: &str) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u8(Opcode::Send.as_u8()).await?;
    write_text(writer, to).await?;
    write_text(writer, body).await?;
    writer.flush().await?;
    Ok(())
}

/// Presence reply: opcode echo, queried username, online flag.
pub async fn write_presence<W>(
    writer: &mut W,
    username: &str,
    online: bool,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u8(Opcode::IsAvailable.as_u8()).await?;
    write_text(writer, username).await?;
    write_flag(writer, online).await?;
    writer.flush().await?;
    Ok(())
}

/// Delivery to a recipient: opcode, sender username, message body.
pub async fn write_message<W>(writer: &mut W, from: &str, body: &str) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u8(Opcode::Received.as_u8()).await?;
    write_text(writer, from).await?;
    write_text(writer, body).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads the next server-originated message on an authenticated stream.
pub async fn read_server_event<R>(reader: &mut R) -> Result<ServerEvent, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let raw = reader.read_u8().await?;
    match Opcode::from_u8(raw) {
        Some(Opcode::IsAvailable) => {
            let username = read_text(reader).await?;
            let online = read_flag(reader).await?;
            Ok(ServerEvent::Presence { username, online })
        }
        Some(Opcode::Received) => {
            let from = read_text(reader).await?;
            let body = read_text(reader).await?;
            Ok(ServerEvent::Message { from, body })
        }
        Some(Opcode::Send) | None => Err(ProtocolError::UnknownOpcode(raw)),
    }
}
