use std::fmt;

use constant_time_eq::constant_time_eq;
use zeroize::Zeroize;

/// A stored secret compared in constant time.
///
/// Verification is the only supported operation during normal serving;
/// [`Credential::expose`] exists solely for the persistence boundary, which
/// snapshots `(username, password)` records. Swapping plaintext storage for
/// a hashed scheme only requires changing this type, not its callers.
pub struct Credential {
    secret: String,
}

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Compares `candidate` against the stored secret without early exit.
    pub fn verify(&self, candidate: &str) -> bool {
        constant_time_eq(self.secret.as_bytes(), candidate.as_bytes())
    }

    /// Reveals the stored secret for persistence snapshots.
    pub fn expose(&self) -> &str {
        &self.secret
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}
