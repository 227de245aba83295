//! Rolling Secret Manager
//! Mission: Rotate token signing secrets without invalidating live tokens
//!
//! A secret is primary (used for signing) for `rotation_window` after it is
//! minted and stays active (used for verification) until
//! `rotation_window + 2 * access_token_ttl`. Every access ages the set first,
//! so no background task is needed.

use crate::auth::secret::SecretStore;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Opaque handle to secret bytes. Never printed.
#[derive(Clone)]
pub struct SigningSecret(Arc<[u8]>);

impl SigningSecret {
    pub(crate) fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningSecret(**redacted**)")
    }
}

struct Secret {
    value: SigningSecret,
    created_at: DateTime<Utc>,
    is_primary: bool,
    is_active: bool,
}

/// Process-wide set of signing secrets, newest first.
pub struct RollingSecretManager {
    rotation_window: Duration,
    access_token_ttl: Duration,
    secrets: Mutex<Vec<Secret>>,
}

impl RollingSecretManager {
    pub fn new(rotation_window: Duration, access_token_ttl: Duration) -> Self {
        Self {
            rotation_window,
            access_token_ttl,
            secrets: Mutex::new(Vec::new()),
        }
    }

    /// Age after which a secret is dropped entirely.
    pub fn retirement_age(&self) -> Duration {
        self.rotation_window + self.access_token_ttl * 2
    }

    /// The secret new tokens are signed with.
    pub fn current_signing_secret(&self) -> Result<SigningSecret> {
        self.current_signing_secret_at(Utc::now())
    }

    pub fn current_signing_secret_at(&self, now: DateTime<Utc>) -> Result<SigningSecret> {
        let mut secrets = self.secrets.lock();
        self.roll(&mut secrets, now)?;
        Ok(secrets[0].value.clone())
    }

    /// Every active secret, newest first.
    pub fn all_verification_secrets(&self) -> Result<Vec<SigningSecret>> {
        self.all_verification_secrets_at(Utc::now())
    }

    pub fn all_verification_secrets_at(&self, now: DateTime<Utc>) -> Result<Vec<SigningSecret>> {
        let mut secrets = self.secrets.lock();
        self.roll(&mut secrets, now)?;
        Ok(secrets
            .iter()
            .filter(|s| s.is_active)
            .map(|s| s.value.clone())
            .collect())
    }

    /// Number of secrets currently held (after aging).
    pub fn active_count_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut secrets = self.secrets.lock();
        self.roll(&mut secrets, now)?;
        Ok(secrets.len())
    }

    fn roll(&self, secrets: &mut Vec<Secret>, now: DateTime<Utc>) -> Result<()> {
        let retirement_age = self.retirement_age();
        for (idx, secret) in secrets.iter_mut().enumerate() {
            let age = now - secret.created_at;
            // Only the newest secret may be primary.
            secret.is_primary = idx == 0 && age < self.rotation_window;
            secret.is_active = age < retirement_age;
        }

        let before = secrets.len();
        secrets.retain(|s| s.is_active);
        if secrets.len() != before {
            debug!("Retired {} signing secret(s)", before - secrets.len());
        }

        if secrets.first().map_or(true, |s| !s.is_primary) {
            secrets.insert(
                0,
                Secret {
                    value: SigningSecret(SecretStore::generate_secret()?.into()),
                    created_at: now,
                    is_primary: true,
                    is_active: true,
                },
            );
            debug!("Minted new primary signing secret ({} active)", secrets.len());
        }

        Ok(())
    }
}
