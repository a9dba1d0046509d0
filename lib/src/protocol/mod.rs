mod message;
mod wire;

pub use message::{
    AuthMode, AuthRequest, HELLO_TOKEN, MAX_PASSWORD_BYTES, MAX_USERNAME_BYTES, Opcode, ResultCode,
    ServerEvent, read_hello, read_result, read_server_event, write_auth_request, write_hello,
    write_message, write_presence, write_presence_query, write_result, write_send,
};
pub use wire::{MAX_TEXT_BYTES, ProtocolError, read_flag, read_text, write_flag, write_text};
