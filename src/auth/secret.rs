//! Secret Store
//! Mission: Produce cryptographically random signing secrets and session keys

use anyhow::{Context, Result};
use rand::{rngs::OsRng, RngCore};

/// Length of generated secrets in bytes.
pub const SECRET_LEN: usize = 32;

/// Source of random secrets backed by the operating system RNG.
pub struct SecretStore;

impl SecretStore {
    /// Generate raw secret bytes for token signing.
    pub fn generate_secret() -> Result<Vec<u8>> {
        let mut buf = vec![0u8; SECRET_LEN];
        OsRng
            .try_fill_bytes(&mut buf)
            .context("Failed to read from OS random number generator")?;
        Ok(buf)
    }

    /// Generate a printable session key. Only its hash is ever persisted.
    pub fn generate_session_key() -> Result<String> {
        Ok(hex::encode(Self::generate_secret()?))
    }
}
