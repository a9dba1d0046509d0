use std::{error::Error, fmt, io, string::FromUtf8Error};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single length-prefixed text field.
pub const MAX_TEXT_BYTES: usize = 4 * 1024;

#[derive(Debug)]
pub enum ProtocolError {
    Io(io::Error),
    InvalidUtf8(FromUtf8Error),
    TextTooLong(usize),
    UnknownOpcode(u8),
    UnknownResultCode(u8),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Io(err) => write!(f, "I/O error: {}", err),
            ProtocolError::InvalidUtf8(err) => write!(f, "text field is not UTF-8: {}", err),
            ProtocolError::TextTooLong(size) => write!(
                f,
                "text field is {} bytes, above configured maximum {}",
                size, MAX_TEXT_BYTES
            ),
            ProtocolError::UnknownOpcode(op) => write!(f, "unknown opcode {}", op),
            ProtocolError::UnknownResultCode(code) => write!(f, "unknown result code {}", code),
        }
    }
}

impl Error for ProtocolError {}

impl From<io::Error> for ProtocolError {
    fn from(value: io::Error) -> Self {
        ProtocolError::Io(value)
    }
}

/// Writes a length-prefixed UTF-8 text field without flushing; callers
/// compose fields into one logical message and flush once.
pub async fn write_text<W>(writer: &mut W, text: &str) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    if text.len() > MAX_TEXT_BYTES {
        return Err(ProtocolError::TextTooLong(text.len()));
    }

    writer.write_u16(text.len() as u16).await?;
    writer.write_all(text.as_bytes()).await?;
    Ok(())
}

pub async fn read_text<R>(reader: &mut R) -> Result<String, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u16().await? as usize;
    if len > MAX_TEXT_BYTES {
        return Err(ProtocolError::TextTooLong(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    String::from_utf8(payload).map_err(ProtocolError::InvalidUtf8)
}

pub async fn write_flag<W>(writer: &mut W, flag: bool) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u8(u8::from(flag)).await?;
    Ok(())
}

pub async fn read_flag<R>(reader: &mut R) -> Result<bool, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    Ok(reader.read_u8().await? != 0)
}
