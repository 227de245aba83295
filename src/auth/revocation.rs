//! Revocation Registry
//! Mission: Reject access tokens issued before a user or session was invalidated
//!
//! Entries only matter while a token signed before the revocation could still
//! be alive, so they are swept lazily once older than `2 * access_token_ttl`.

use crate::auth::models::AccessClaims;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, info};

/// What a revocation entry covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RevocationScope {
    User,
    Session,
}

/// Process-wide registry of invalidated users and sessions.
pub struct RevocationRegistry {
    retention: Duration,
    /// (scope, id) -> invalidated at, unix milliseconds
    entries: Mutex<HashMap<(RevocationScope, i64), i64>>,
}

impl RevocationRegistry {
    pub fn new(access_token_ttl: Duration) -> Self {
        Self {
            retention: access_token_ttl * 2,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn invalidate_user(&self, user_id: i64) {
        self.invalidate_at(RevocationScope::User, user_id, Utc::now());
    }

    pub fn invalidate_session(&self, session_id: i64) {
        self.invalidate_at(RevocationScope::Session, session_id, Utc::now());
    }

    pub fn invalidate_at(&self, scope: RevocationScope, id: i64, now: DateTime<Utc>) {
        let mut entries = self.entries.lock();
        self.sweep(&mut entries, now);
        entries.insert((scope, id), now.timestamp_millis());
        info!("Invalidated {:?} {}", scope, id);
    }

    /// False when the token's session or user was invalidated at or after its issue time.
    pub fn is_valid(&self, claims: &AccessClaims) -> bool {
        self.is_valid_at(claims, Utc::now())
    }

    pub fn is_valid_at(&self, claims: &AccessClaims, now: DateTime<Utc>) -> bool {
        let mut entries = self.entries.lock();
        self.sweep(&mut entries, now);

        let issued_at = claims.issued_at_ms();
        let revoked = |key: (RevocationScope, i64)| {
            entries
                .get(&key)
                .is_some_and(|&invalidated_at| invalidated_at >= issued_at)
        };

        let session_revoked = revoked((RevocationScope::Session, claims.session_id()));
        let user_revoked = claims
            .user_id()
            .is_some_and(|user_id| revoked((RevocationScope::User, user_id)));

        !(session_revoked || user_revoked)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep(&self, entries: &mut HashMap<(RevocationScope, i64), i64>, now: DateTime<Utc>) {
        let cutoff = (now - self.retention).timestamp_millis();
        let before = entries.len();
        entries.retain(|_, invalidated_at| *invalidated_at > cutoff);
        if entries.len() != before {
            debug!("Swept {} expired revocation entries", before - entries.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::ACCESS_TOKEN_TYPE;

    fn claims_issued(at: DateTime<Utc>) -> AccessClaims {
        AccessClaims {
            t: ACCESS_TOKEN_TYPE.to_string(),
            s: 10,
            k: "k".to_string(),
            u: Some(20),
            c: at.timestamp_millis(),
            r: Some("user".to_string()),
        }
    }

    #[test]
    fn test_unrevoked_token_is_valid() {
        let registry = RevocationRegistry::new(Duration::minutes(15));
        assert!(registry.is_valid(&claims_issued(Utc::now())));
    }

    #[test]
    fn test_user_revocation_rejects_older_tokens_only() {
        let registry = RevocationRegistry::new(Duration::minutes(15));
        let t0 = Utc::now();
        let before = claims_issued(t0);

        registry.invalidate_at(RevocationScope::User, 20, t0 + Duration::seconds(1));

        assert!(!registry.is_valid_at(&before, t0 + Duration::seconds(2)));

        let after = claims_issued(t0 + Duration::seconds(2));
        assert!(registry.is_valid_at(&after, t0 + Duration::seconds(3)));
    }

    #[test]
    fn test_session_revocation() {
        let registry = RevocationRegistry::new(Duration::minutes(15));
        let t0 = Utc::now();
        let claims = claims_issued(t0);

        registry.invalidate_at(RevocationScope::Session, 10, t0);
        // Same-instant revocation covers the token.
        assert!(!registry.is_valid_at(&claims, t0));

        let mut other_session = claims_issued(t0);
        other_session.s = 11;
        assert!(registry.is_valid_at(&other_session, t0));
    }

    #[test]
    fn test_entries_expire_lazily() {
        let registry = RevocationRegistry::new(Duration::minutes(15));
        let t0 = Utc::now();
        registry.invalidate_at(RevocationScope::User, 20, t0);
        registry.invalidate_at(RevocationScope::Session, 10, t0);
        assert_eq!(registry.len(), 2);

        // Any token issued before the revocation has expired by now.
        let old = claims_issued(t0 - Duration::seconds(1));
        assert!(registry.is_valid_at(&old, t0 + Duration::minutes(31)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_invalidations_are_not_lost() {
        let registry = std::sync::Arc::new(RevocationRegistry::new(Duration::minutes(15)));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        registry.invalidate_session(i * 100 + j);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 400);
    }
}
