//! Persistence collaborator: a versioned list-of-records snapshot of the
//! account directory, loaded before the accept loop starts and saved after
//! it drains.

use std::{error::Error, fmt, fs, io, path::Path};

use serde::{Deserialize, Serialize};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
struct AccountsFile {
    version: u32,
    accounts: Vec<AccountRecord>,
}

#[derive(Debug)]
pub enum PersistError {
    Io(io::Error),
    Json(serde_json::Error),
    UnsupportedVersion(u32),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Io(err) => write!(f, "I/O error: {}", err),
            PersistError::Json(err) => write!(f, "JSON error: {}", err),
            PersistError::UnsupportedVersion(version) => write!(
                f,
                "accounts file version {} is not supported (expected {})",
                version, FORMAT_VERSION
            ),
        }
    }
}

impl Error for PersistError {}

impl From<io::Error> for PersistError {
    fn from(value: io::Error) -> Self {
        PersistError::Io(value)
    }
}

pub fn load_accounts(path: impl AsRef<Path>) -> Result<Vec<AccountRecord>, PersistError> {
    let payload = fs::read(path)?;
    let file: AccountsFile = serde_json::from_slice(&payload).map_err(PersistError::Json)?;
    if file.version != FORMAT_VERSION {
        return Err(PersistError::UnsupportedVersion(file.version));
    }
    Ok(file.accounts)
}

pub fn save_accounts(
    path: impl AsRef<Path>,
    records: Vec<AccountRecord>,
) -> Result<(), PersistError> {
    let file = AccountsFile {
        version: FORMAT_VERSION,
        accounts: records,
    };
    let payload = serde_json::to_vec_pretty(&file).map_err(PersistError::Json)?;
    fs::write(path, payload)?;
    Ok(())
}
