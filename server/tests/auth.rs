use std::{error::Error, net::SocketAddr, time::Duration};

use herald_client::Client;
use herald_lib::protocol::{HELLO_TOKEN, ResultCode};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
    time::timeout,
};

async fn spawn_server() -> Result<(SocketAddr, JoinHandle<()>), Box<dyn Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let task = tokio::spawn(async move {
        let _ = herald_server::run(listener).await;
    });
    Ok((addr, task))
}

#[tokio::test]
async fn register_then_login_succeeds() -> Result<(), Box<dyn Error>> {
    let (addr, server_task) = spawn_server().await?;

    let mut first = Client::connect(addr).await?;
    let code = timeout(Duration::from_secs(2), first.register("ada", "hunter2")).await??;
    assert_eq!(code, ResultCode::Ok);

    let mut second = Client::connect(addr).await?;
    let code = timeout(Duration::from_secs(2), second.login("ada", "hunter2")).await??;
    assert_eq!(code, ResultCode::Ok);

    server_task.abort();
    let _ = server_task.await;
    Ok(())
}

#[tokio::test]
async fn login_with_wrong_password_is_rejected() -> Result<(), Box<dyn Error>> {
    let (addr, server_task) = spawn_server().await?;

    let mut first = Client::connect(addr).await?;
    assert_eq!(
        timeout(Duration::from_secs(2), first.register("ada", "hunter2")).await??,
        ResultCode::Ok
    );

    let mut second = Client::connect(addr).await?;
    let code = timeout(Duration::from_secs(2), second.login("ada", "letmein")).await??;
    assert_eq!(code, ResultCode::WrongPassword);

    server_task.abort();
    let _ = server_task.await;
    Ok(())
}

#[tokio::test]
async fn login_for_unknown_user_is_rejected() -> Result<(), Box<dyn Error>> {
    let (addr, server_task) = spawn_server().await?;

    let mut client = Client::connect(addr).await?;
    let code = timeout(Duration::from_secs(2), client.login("ghost", "pw")).await??;
    assert_eq!(code, ResultCode::UnknownUser);

    server_task.abort();
    let _ = server_task.await;
    Ok(())
}

#[tokio::test]
async fn duplicate_registration_is_rejected() -> Result<(), Box<dyn Error>> {
    let (addr, server_task) = spawn_server().await?;

    let mut first = Client::connect(addr).await?;
    assert_eq!(
        timeout(Duration::from_secs(2), first.register("dup", "pw")).await??,
        ResultCode::Ok
    );

    let mut second = Client::connect(addr).await?;
    let code = timeout(Duration::from_secs(2), second.register("dup", "pw")).await??;
    assert_eq!(code, ResultCode::AlreadyExists);

    server_task.abort();
    let _ = server_task.await;
    Ok(())
}

#[tokio::test]
async fn concurrent_duplicate_registration_yields_one_success() -> Result<(), Box<dyn Error>> {
    let (addr, server_task) = spawn_server().await?;

    let race = |addr: SocketAddr| async move {
        let mut client = Client::connect(addr).await?;
        let code = timeout(Duration::from_secs(2), client.register("race", "pw")).await??;
        Ok::<ResultCode, Box<dyn Error>>(code)
    };

    let (first, second) = tokio::join!(race(addr), race(addr));
    let codes = [first?, second?];
    assert_eq!(codes.iter().filter(|c| **c == ResultCode::Ok).count(), 1);
    assert_eq!(
        codes
            .iter()
            .filter(|c| **c == ResultCode::AlreadyExists)
            .count(),
        1
    );

    server_task.abort();
    let _ = server_task.await;
    Ok(())
}

#[tokio::test]
async fn boundary_lengths_are_accepted() -> Result<(), Box<dyn Error>> {
    let (addr, server_task) = spawn_server().await?;

    let username = "a".repeat(9);
    let password = "b".repeat(19);
    let mut client = Client::connect(addr).await?;
    let code = timeout(Duration::from_secs(2), client.register(&username, &password)).await??;
    assert_eq!(code, ResultCode::Ok);

    server_task.abort();
    let _ = server_task.await;
    Ok(())
}

#[tokio::test]
async fn overlong_username_is_rejected() -> Result<(), Box<dyn Error>> {
    let (addr, server_task) = spawn_server().await?;

    let mut client = Client::connect(addr).await?;
    let code = timeout(
        Duration::from_secs(2),
        client.register(&"a".repeat(10), "pw"),
    )
    .await??;
    assert_eq!(code, ResultCode::UsernameTooLong);

    server_task.abort();
    let _ = server_task.await;
    Ok(())
}

#[tokio::test]
async fn overlong_password_is_rejected() -> Result<(), Box<dyn Error>> {
    let (addr, server_task) = spawn_server().await?;

    let mut client = Client::connect(addr).await?;
    let code = timeout(
        Duration::from_secs(2),
        client.register("ada", &"b".repeat(20)),
    )
    .await??;
    assert_eq!(code, ResultCode::PasswordTooLong);

    server_task.abort();
    let _ = server_task.await;
    Ok(())
}

#[tokio::test]
async fn handshake_mismatch_closes_without_response() -> Result<(), Box<dyn Error>> {
    let (addr, server_task) = spawn_server().await?;

    let mut stream = TcpStream::connect(addr).await?;
    let token = timeout(Duration::from_secs(2), stream.read_u32()).await??;
    assert_eq!(token, HELLO_TOKEN);

    stream.write_u32(HELLO_TOKEN + 1).await?;
    stream.flush().await?;

    // The server must close without writing any auth response byte.
    let mut buf = [0u8; 1];
    let n = timeout(Duration::from_secs(2), stream.read(&mut buf)).await??;
    assert_eq!(n, 0);

    server_task.abort();
    let _ = server_task.await;
    Ok(())
}
