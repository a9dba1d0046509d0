use std::env;

use herald_lib::constants::DEFAULT_SERVER_PORT;
use herald_server::{AccountStore, BoxError, persist, signal};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt::init();

    let accounts_path = env::var("ACCOUNTS_FILE").unwrap_or_else(|_| "accounts.json".into());
    let store = AccountStore::new();
    match persist::load_accounts(&accounts_path) {
        Ok(records) => {
            let count = records.len();
            store.bulk_load(records).await;
            info!("loaded {} accounts from {}", count, accounts_path);
        }
        Err(err) => {
            warn!(
                "failed to load accounts from {}, starting with an empty directory: {}",
                accounts_path, err
            );
        }
    }

    let listener = TcpListener::bind(format!("0.0.0.0:{}", DEFAULT_SERVER_PORT)).await?;
    herald_server::run_until(listener, signal::shutdown_signal(), store.clone()).await?;

    let snapshot = store.snapshot().await;
    let count = snapshot.len();
    if let Err(err) = persist::save_accounts(&accounts_path, snapshot) {
        error!("failed to save {} accounts to {}: {}", count, accounts_path, err);
    } else {
        info!("saved {} accounts to {}", count, accounts_path);
    }
    Ok(())
}
