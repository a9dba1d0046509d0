//! Line-oriented chat front-end.
//!
//! `/who <user>` queries presence; `<user> <message>` relays a message.
//! Incoming deliveries print as they arrive.

use std::error::Error;

use clap::Parser;
use herald_lib::{
    constants::DEFAULT_SERVER_PORT,
    protocol::{ResultCode, ServerEvent, read_server_event, write_presence_query, write_send},
};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::Client;

#[derive(Parser)]
#[command(name = "herald-client", about = "Chat client for a herald server")]
pub struct Args {
    /// Server address to connect to.
    #[arg(long, default_value_t = format!("127.0.0.1:{}", DEFAULT_SERVER_PORT))]
    server: String,

    /// Create the account instead of logging into an existing one.
    #[arg(long)]
    register: bool,

    username: String,
    password: String,
}

pub async fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let mut client = Client::connect(&args.server).await?;
    let code = if args.register {
        client.register(&args.username, &args.password).await?
    } else {
        client.login(&args.username, &args.password).await?
    };
    match code {
        ResultCode::Ok => println!("signed in as {}", args.username),
        ResultCode::UsernameTooLong => return Err("username is too long (max 9 bytes)".into()),
        ResultCode::PasswordTooLong => return Err("password is too long (max 19 bytes)".into()),
        ResultCode::AlreadyExists => return Err("that username is already registered".into()),
        ResultCode::UnknownUser => return Err("no such user; try --register".into()),
        ResultCode::WrongPassword => return Err("wrong password".into()),
    }

    let (mut reader, mut writer) = client.into_inner().into_split();

    let mut incoming = tokio::spawn(async move {
        loop {
            match read_server_event(&mut reader).await {
                Ok(ServerEvent::Message { from, body }) => println!("[{}] {}", from, body),
                Ok(ServerEvent::Presence { username, online }) => {
                    println!("{} is {}", username, if online { "online" } else { "offline" });
                }
                Err(_) => {
                    println!("disconnected from server");
                    return;
                }
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if let Some(who) = line.strip_prefix("/who ") {
                    write_presence_query(&mut writer, who.trim()).await?;
                } else if let Some((to, body)) = line.split_once(' ') {
                    write_send(&mut writer, to, body).await?;
                } else {
                    println!("usage: '/who <user>' or '<user> <message>'");
                }
            }
            _ = &mut incoming => break,
        }
    }

    incoming.abort();
    Ok(())
}
