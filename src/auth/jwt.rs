//! JWT Token Codec
//! Mission: Sign and verify compact tokens against the rolling secret set

use crate::auth::rolling::RollingSecretManager;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Token codec errors.
///
/// `SignatureInvalid` and `Expired` are the two outcomes callers may recover
/// from (session fallback); everything else is unexpected.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signature invalid")]
    SignatureInvalid,

    #[error("token expired")]
    Expired,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("signing secrets unavailable: {0}")]
    SecretsUnavailable(String),
}

impl TokenError {
    /// Whether the failure allows falling back to the backing session.
    pub fn allows_session_fallback(&self) -> bool {
        matches!(self, TokenError::SignatureInvalid | TokenError::Expired)
    }
}

/// Payload wrapper adding issue and expiry times (unix seconds).
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<C> {
    #[serde(flatten)]
    claims: C,
    iat: i64,
    exp: i64,
}

/// Signs and verifies HS256 tokens using the rolling secret set.
pub struct TokenCodec {
    secrets: Arc<RollingSecretManager>,
}

impl TokenCodec {
    pub fn new(secrets: Arc<RollingSecretManager>) -> Self {
        Self { secrets }
    }

    pub fn secrets(&self) -> &RollingSecretManager {
        &self.secrets
    }

    /// Sign `claims` with the current primary secret, valid for `ttl`.
    pub fn sign<C: Serialize>(&self, claims: &C, ttl: Duration) -> Result<String, TokenError> {
        self.sign_at(claims, ttl, Utc::now())
    }

    pub fn sign_at<C: Serialize>(
        &self,
        claims: &C,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let secret = self
            .secrets
            .current_signing_secret_at(now)
            .map_err(|e| TokenError::SecretsUnavailable(e.to_string()))?;

        let envelope = Envelope {
            claims,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &envelope,
            &EncodingKey::from_secret(secret.bytes()),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))?;

        debug!("Signed token, expires in {}s", ttl.num_seconds());
        Ok(token)
    }

    /// Verify `token` against every active secret, newest first.
    pub fn verify<C: DeserializeOwned>(&self, token: &str) -> Result<C, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at<C: DeserializeOwned>(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<C, TokenError> {
        let secrets = self
            .secrets
            .all_verification_secrets_at(now)
            .map_err(|e| TokenError::SecretsUnavailable(e.to_string()))?;

        // Expiry is checked against `now` below, not the system clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        for secret in &secrets {
            match decode::<Envelope<C>>(token, &DecodingKey::from_secret(secret.bytes()), &validation)
            {
                Ok(data) => {
                    if now.timestamp() >= data.claims.exp {
                        return Err(TokenError::Expired);
                    }
                    return Ok(data.claims.claims);
                }
                Err(e) if matches!(e.kind(), ErrorKind::InvalidSignature) => continue,
                Err(e) => return Err(TokenError::Malformed(e.to_string())),
            }
        }

        Err(TokenError::SignatureInvalid)
    }
}

/// Structurally decode a token payload without checking its signature.
pub fn decode_unverified<C: DeserializeOwned>(token: &str) -> Option<C> {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}
