//! Auth Service
//! Mission: Turn presented credentials into a request identity, with silent refresh
//!
//! A request moves through `Unauthenticated -> TokenPresented -> {Valid, Invalid}`.
//! Verification has two paths: the signed token alone (fast path), or the
//! backing session when the token expired or was signed under a retired
//! secret (slow path, mints a fresh token).

use crate::auth::config::{AuthConfig, TOKEN_COOKIE};
use crate::auth::jwt::{decode_unverified, TokenCodec, TokenError};
use crate::auth::models::{AccessClaims, AuthenticatedIdentity, User, ACCESS_TOKEN_TYPE};
use crate::auth::revocation::RevocationRegistry;
use crate::auth::rolling::RollingSecretManager;
use crate::auth::secret::SecretStore;
use crate::auth::session_store::{Session, SessionStore};
use crate::auth::user_store::{UserChanges, UserStore};
use anyhow::Context;
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Unexpected failures inside the auth core. Ordinary rejections are not errors.
#[derive(Debug, Error)]
pub enum AuthServiceError {
    #[error("user {0} not found")]
    UnknownUser(i64),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Why a presented token did not produce an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Undecodable,
    NotAccessToken,
    IssuedInFuture,
    Revoked,
    NoUser,
    NoSession,
    SessionKeyMismatch,
    UserMissing,
}

/// A successfully validated token.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub identity: AuthenticatedIdentity,
    pub claims: AccessClaims,
    /// Set when a new token was minted (login or silent refresh).
    pub issued_token: Option<String>,
}

/// What the response should tell the client about its token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenDirective {
    Set(String),
    Clear,
}

/// Per-request authentication state.
#[derive(Debug)]
pub enum RequestAuth {
    Unauthenticated,
    TokenPresented(String),
    Valid(Authenticated),
    Invalid(Rejection),
}

impl RequestAuth {
    /// Bearer header first, then the `token` cookie when cookies are enabled.
    pub fn extract(headers: &HeaderMap, use_cookies: bool) -> Self {
        let token = extract_bearer_token(headers).or_else(|| {
            if use_cookies {
                extract_cookie_token(headers)
            } else {
                None
            }
        });

        match token {
            Some(token) => RequestAuth::TokenPresented(token),
            None => RequestAuth::Unauthenticated,
        }
    }

    /// Validate a presented token. Other states are terminal and returned as-is.
    pub fn advance(self, service: &AuthService) -> Result<Self, AuthServiceError> {
        self.advance_at(service, Utc::now())
    }

    pub fn advance_at(
        self,
        service: &AuthService,
        now: DateTime<Utc>,
    ) -> Result<Self, AuthServiceError> {
        match self {
            RequestAuth::TokenPresented(token) => service.validate_token_at(&token, now),
            terminal => Ok(terminal),
        }
    }

    pub fn identity(&self) -> Option<&AuthenticatedIdentity> {
        match self {
            RequestAuth::Valid(auth) => Some(&auth.identity),
            _ => None,
        }
    }

    /// Directive for a token minted while validating, if any.
    pub fn directive(&self) -> Option<TokenDirective> {
        match self {
            RequestAuth::Valid(Authenticated {
                issued_token: Some(token),
                ..
            }) => Some(TokenDirective::Set(token.clone())),
            _ => None,
        }
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn extract_cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == TOKEN_COOKIE && !val.trim().is_empty()).then(|| val.trim().to_string())
        })
}

/// Session-backed token authentication.
pub struct AuthService {
    config: AuthConfig,
    codec: TokenCodec,
    revocations: RevocationRegistry,
    sessions: Arc<SessionStore>,
    users: Arc<UserStore>,
}

impl AuthService {
    pub fn new(config: AuthConfig, sessions: Arc<SessionStore>, users: Arc<UserStore>) -> Self {
        let secrets = Arc::new(RollingSecretManager::new(
            config.rolling_secret_timeout,
            config.access_token_ttl,
        ));
        Self {
            codec: TokenCodec::new(secrets),
            revocations: RevocationRegistry::new(config.access_token_ttl),
            config,
            sessions,
            users,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn revocations(&self) -> &RevocationRegistry {
        &self.revocations
    }

    pub fn validate_token(&self, token: &str) -> Result<RequestAuth, AuthServiceError> {
        self.validate_token_at(token, Utc::now())
    }

    /// Decode, verify, check revocation, and fall back to the session when allowed.
    pub fn validate_token_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<RequestAuth, AuthServiceError> {
        let Some(decoded) = decode_unverified::<AccessClaims>(token) else {
            return Ok(RequestAuth::Invalid(Rejection::Undecodable));
        };
        if !decoded.is_access() {
            return Ok(RequestAuth::Invalid(Rejection::NotAccessToken));
        }
        if decoded.c > now.timestamp_millis() {
            warn!("Rejected token for session {} issued in the future", decoded.s);
            return Ok(RequestAuth::Invalid(Rejection::IssuedInFuture));
        }

        match self.codec.verify_at::<AccessClaims>(token, now) {
            Ok(claims) => {
                if !self.revocations.is_valid_at(&claims, now) {
                    warn!("Rejected revoked token for session {}", claims.s);
                    return Ok(RequestAuth::Invalid(Rejection::Revoked));
                }
                Ok(bind(claims, None))
            }
            Err(e) if e.allows_session_fallback() => {
                debug!("Token {} for session {}, trying session fallback", e, decoded.s);
                self.session_fallback(&decoded, now)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn session_fallback(
        &self,
        decoded: &AccessClaims,
        now: DateTime<Utc>,
    ) -> Result<RequestAuth, AuthServiceError> {
        let Some(user_id) = decoded.u else {
            return Ok(RequestAuth::Invalid(Rejection::NoSession));
        };

        let Some(session) = self
            .sessions
            .find_valid(decoded.s, user_id, now.timestamp_millis())?
        else {
            return Ok(RequestAuth::Invalid(Rejection::NoSession));
        };

        let key_matches =
            bcrypt::verify(&decoded.k, &session.hashed_key).context("Failed to verify session key")?;
        if !key_matches {
            warn!("Session key mismatch for session {}", session.id);
            return Ok(RequestAuth::Invalid(Rejection::SessionKeyMismatch));
        }

        let Some(claims) = self.access_claims_for(&session, &decoded.k, now)? else {
            return Ok(RequestAuth::Invalid(Rejection::UserMissing));
        };
        let token = self
            .codec
            .sign_at(&claims, self.config.access_token_ttl, now)?;

        debug!("Refreshed access token for session {}", session.id);
        Ok(bind(claims, Some(token)))
    }

    /// Fresh claims for `session`, carrying the user's current role.
    fn access_claims_for(
        &self,
        session: &Session,
        key: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<AccessClaims>> {
        let role = match session.user_id {
            Some(user_id) => match self.users.get_user(user_id)? {
                Some(user) => Some(user.role.as_str().to_string()),
                None => return Ok(None),
            },
            None => None,
        };

        Ok(Some(AccessClaims {
            t: ACCESS_TOKEN_TYPE.to_string(),
            s: session.id,
            k: key.to_string(),
            u: session.user_id,
            c: now.timestamp_millis(),
            r: role,
        }))
    }

    pub fn login(&self, user_id: i64) -> Result<Authenticated, AuthServiceError> {
        self.login_at(user_id, Utc::now())
    }

    /// Open a new session for `user_id` and issue its first access token.
    pub fn login_at(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Authenticated, AuthServiceError> {
        if self.users.get_user(user_id)?.is_none() {
            return Err(AuthServiceError::UnknownUser(user_id));
        }

        let now_ms = now.timestamp_millis();
        self.sessions.purge_expired(now_ms)?;

        let key = SecretStore::generate_session_key()?;
        let hashed_key =
            bcrypt::hash(&key, self.config.session_key_cost).context("Failed to hash session key")?;
        let expires_at = self
            .config
            .session_max_age
            .map(|age| (now + age).timestamp_millis());
        let session = self
            .sessions
            .create(Some(user_id), &hashed_key, expires_at, now_ms)?;

        let claims = self
            .access_claims_for(&session, &key, now)?
            .ok_or(AuthServiceError::UnknownUser(user_id))?;
        let token = self
            .codec
            .sign_at(&claims, self.config.access_token_ttl, now)?;

        info!("User {} logged in, session {}", user_id, session.id);
        match bind(claims, Some(token)) {
            RequestAuth::Valid(auth) => Ok(auth),
            _ => Err(AuthServiceError::UnknownUser(user_id)),
        }
    }

    /// End sessions.
    ///
    /// With `user_id`, every session of that user is revoked and deleted (mass
    /// logout). When no target is given, or the target is the caller, the
    /// caller's current session is ended too and the returned directive
    /// clears its token.
    pub fn logout(
        &self,
        current: Option<&AuthenticatedIdentity>,
        user_id: Option<i64>,
    ) -> Result<Option<TokenDirective>, AuthServiceError> {
        if let Some(user_id) = user_id {
            self.revocations.invalidate_user(user_id);
            let deleted = self.sessions.delete_for_user(user_id)?;
            info!("Logged out user {} from {} session(s)", user_id, deleted);
        }

        let targets_caller = match (user_id, current) {
            (None, _) => true,
            (Some(user_id), Some(identity)) => identity.user_id == user_id,
            (Some(_), None) => false,
        };
        if !targets_caller {
            return Ok(None);
        }

        if let Some(identity) = current {
            self.revocations.invalidate_session(identity.session_id);
            self.sessions.delete(identity.session_id)?;
            info!(
                "User {} logged out of session {}",
                identity.user_id, identity.session_id
            );
        }
        Ok(Some(TokenDirective::Clear))
    }

    /// Apply `changes` to `user_id` on behalf of `current`.
    ///
    /// A role change logs the target out everywhere so tokens carrying the
    /// old role stop verifying. `None` when the user does not exist.
    pub fn update_user(
        &self,
        current: Option<&AuthenticatedIdentity>,
        user_id: i64,
        changes: &UserChanges,
    ) -> Result<Option<UpdatedUser>, AuthServiceError> {
        let Some(existing) = self.users.get_user(user_id)? else {
            return Ok(None);
        };
        let Some(user) = self.users.update_user(user_id, changes)? else {
            return Ok(None);
        };

        let mut directive = None;
        if user.role != existing.role {
            info!(
                "Role of user {} changed from {} to {}",
                user_id, existing.role, user.role
            );
            directive = self.logout(current, Some(user_id))?;
        }
        Ok(Some(UpdatedUser { user, directive }))
    }
}

/// Result of [`AuthService::update_user`].
#[derive(Debug)]
pub struct UpdatedUser {
    pub user: User,
    pub directive: Option<TokenDirective>,
}

fn bind(claims: AccessClaims, issued_token: Option<String>) -> RequestAuth {
    match AuthenticatedIdentity::from_claims(&claims) {
        Some(identity) => RequestAuth::Valid(Authenticated {
            identity,
            claims,
            issued_token,
        }),
        None => RequestAuth::Invalid(Rejection::NoUser),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;
    use crate::auth::user_store::{NewUser, UserChanges};
    use axum::http::HeaderValue;
    use chrono::Duration;
    use tempfile::NamedTempFile;

    struct Fixture {
        service: AuthService,
        users: Arc<UserStore>,
        sessions: Arc<SessionStore>,
        _db: NamedTempFile,
    }

    fn fixture() -> Fixture {
        let db = NamedTempFile::new().unwrap();
        let path = db.path().to_str().unwrap();
        let users = Arc::new(UserStore::new(path, 4, None).unwrap());
        let sessions = Arc::new(SessionStore::new(path).unwrap());
        let config = AuthConfig {
            session_key_cost: 4,
            ..AuthConfig::default()
        };
        Fixture {
            service: AuthService::new(config, sessions.clone(), users.clone()),
            users,
            sessions,
            _db: db,
        }
    }

    fn create_user(users: &UserStore, email: &str) -> i64 {
        users
            .create_user(&NewUser {
                email: email.to_string(),
                password: Some("123".to_string()),
                role: Role::User,
                first_name: String::new(),
                last_name: String::new(),
            })
            .unwrap()
            .id
    }

    fn token_of(auth: &Authenticated) -> String {
        auth.issued_token.clone().unwrap()
    }

    fn valid(state: RequestAuth) -> Authenticated {
        match state {
            RequestAuth::Valid(auth) => auth,
            other => panic!("expected valid identity, got {other:?}"),
        }
    }

    #[test]
    fn test_login_token_verifies_to_same_user() {
        let fx = fixture();
        let user_id = create_user(&fx.users, "a@x.com");

        let auth = fx.service.login(user_id).unwrap();
        assert_eq!(auth.identity.user_id, user_id);
        assert!(auth.identity.has_role(Role::User));

        let validated = valid(fx.service.validate_token(&token_of(&auth)).unwrap());
        assert_eq!(validated.identity.user_id, user_id);
        assert_eq!(validated.identity.session_id, auth.identity.session_id);
        // Fast path does not mint a new token.
        assert!(validated.issued_token.is_none());
    }

    #[test]
    fn test_login_unknown_user_fails() {
        let fx = fixture();
        assert!(matches!(
            fx.service.login(999),
            Err(AuthServiceError::UnknownUser(999))
        ));
    }

    #[test]
    fn test_expired_token_refreshes_through_session() {
        let fx = fixture();
        let user_id = create_user(&fx.users, "a@x.com");
        let t0 = Utc::now();
        let auth = fx.service.login_at(user_id, t0).unwrap();

        let later = t0 + Duration::minutes(20);
        let refreshed = valid(fx.service.validate_token_at(&token_of(&auth), later).unwrap());

        assert_eq!(refreshed.identity.user_id, user_id);
        assert!(refreshed.claims.c > auth.claims.c);
        let new_token = token_of(&refreshed);
        assert_ne!(new_token, token_of(&auth));

        // The refreshed token verifies on the fast path.
        let again = valid(fx.service.validate_token_at(&new_token, later).unwrap());
        assert!(again.issued_token.is_none());
    }

    #[test]
    fn test_expired_token_after_session_expiry_is_rejected() {
        let fx = fixture();
        let user_id = create_user(&fx.users, "a@x.com");
        let t0 = Utc::now();
        let auth = fx.service.login_at(user_id, t0).unwrap();

        let state = fx
            .service
            .validate_token_at(&token_of(&auth), t0 + Duration::hours(25))
            .unwrap();
        assert!(matches!(state, RequestAuth::Invalid(Rejection::NoSession)));
    }

    #[test]
    fn test_tampered_session_key_is_rejected() {
        let fx = fixture();
        let user_id = create_user(&fx.users, "a@x.com");
        let auth = fx.service.login(user_id).unwrap();

        // Same session id, wrong key, signed by a foreign secret.
        let foreign = TokenCodec::new(Arc::new(RollingSecretManager::new(
            Duration::hours(1),
            Duration::minutes(15),
        )));
        let mut forged = auth.claims.clone();
        forged.k = "00".repeat(32);
        let token = foreign.sign(&forged, Duration::minutes(15)).unwrap();

        let state = fx.service.validate_token(&token).unwrap();
        assert!(matches!(
            state,
            RequestAuth::Invalid(Rejection::SessionKeyMismatch)
        ));
    }

    #[test]
    fn test_structural_rejections() {
        let fx = fixture();
        assert!(matches!(
            fx.service.validate_token("logout").unwrap(),
            RequestAuth::Invalid(Rejection::Undecodable)
        ));

        let user_id = create_user(&fx.users, "a@x.com");
        let auth = fx.service.login(user_id).unwrap();

        let mut refresh = auth.claims.clone();
        refresh.t = "r".to_string();
        let token = fx.service.codec.sign(&refresh, Duration::minutes(15)).unwrap();
        assert!(matches!(
            fx.service.validate_token(&token).unwrap(),
            RequestAuth::Invalid(Rejection::NotAccessToken)
        ));

        let mut future = auth.claims.clone();
        future.c = (Utc::now() + Duration::minutes(5)).timestamp_millis();
        let token = fx.service.codec.sign(&future, Duration::minutes(15)).unwrap();
        assert!(matches!(
            fx.service.validate_token(&token).unwrap(),
            RequestAuth::Invalid(Rejection::IssuedInFuture)
        ));
    }

    #[test]
    fn test_role_change_rejects_stale_tokens() {
        let fx = fixture();
        let user_id = create_user(&fx.users, "a@x.com");
        let t0 = Utc::now() - Duration::seconds(10);
        let before = fx.service.login_at(user_id, t0).unwrap();

        let updated = fx
            .service
            .update_user(
                None,
                user_id,
                &UserChanges {
                    role: Some(Role::Admin),
                    ..UserChanges::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.user.role, Role::Admin);
        assert_eq!(updated.directive, None);
        assert_eq!(fx.sessions.count_for_user(user_id).unwrap(), 0);

        let stale = fx.service.validate_token(&token_of(&before)).unwrap();
        assert!(matches!(stale, RequestAuth::Invalid(Rejection::Revoked)));

        // Issued strictly after the revocation instant.
        let t1 = Utc::now() + Duration::seconds(1);
        let after = fx.service.login_at(user_id, t1).unwrap();
        assert!(after.identity.is_admin());
        let fresh = valid(fx.service.validate_token_at(&token_of(&after), t1).unwrap());
        assert!(fresh.identity.is_admin());
    }

    #[test]
    fn test_update_without_role_change_keeps_sessions() {
        let fx = fixture();
        let user_id = create_user(&fx.users, "a@x.com");
        let auth = fx.service.login(user_id).unwrap();

        let updated = fx
            .service
            .update_user(
                Some(&auth.identity),
                user_id,
                &UserChanges {
                    first_name: Some("Ann".to_string()),
                    role: Some(Role::User),
                    ..UserChanges::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.user.first_name, "Ann");
        assert_eq!(updated.directive, None);
        assert_eq!(fx.sessions.count_for_user(user_id).unwrap(), 1);
        valid(fx.service.validate_token(&token_of(&auth)).unwrap());

        assert!(fx
            .service
            .update_user(None, 0, &UserChanges::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_own_role_change_clears_caller_token() {
        let fx = fixture();
        let user_id = create_user(&fx.users, "a@x.com");
        let auth = fx.service.login(user_id).unwrap();

        let updated = fx
            .service
            .update_user(
                Some(&auth.identity),
                user_id,
                &UserChanges {
                    role: Some(Role::Admin),
                    ..UserChanges::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.directive, Some(TokenDirective::Clear));
        assert_eq!(fx.sessions.count_for_user(user_id).unwrap(), 0);
    }

    #[test]
    fn test_double_logout_is_an_auth_failure_not_a_crash() {
        let fx = fixture();
        let user_id = create_user(&fx.users, "a@x.com");
        let t0 = Utc::now() - Duration::seconds(10);
        let auth = fx.service.login_at(user_id, t0).unwrap();

        let directive = fx.service.logout(Some(&auth.identity), None).unwrap();
        assert_eq!(directive, Some(TokenDirective::Clear));
        assert_eq!(fx.sessions.count_for_user(user_id).unwrap(), 0);

        let second = fx.service.logout(Some(&auth.identity), None).unwrap();
        assert_eq!(second, Some(TokenDirective::Clear));

        let state = fx.service.validate_token(&token_of(&auth)).unwrap();
        assert!(matches!(state, RequestAuth::Invalid(Rejection::Revoked)));
    }

    #[test]
    fn test_logged_out_session_cannot_refresh() {
        let fx = fixture();
        let user_id = create_user(&fx.users, "a@x.com");
        let t0 = Utc::now();
        let auth = fx.service.login_at(user_id, t0).unwrap();
        fx.service.logout(Some(&auth.identity), None).unwrap();

        // Token expired and the session is gone.
        let state = fx
            .service
            .validate_token_at(&token_of(&auth), t0 + Duration::minutes(20))
            .unwrap();
        assert!(matches!(state, RequestAuth::Invalid(Rejection::NoSession)));
    }

    #[test]
    fn test_mass_logout_of_other_user_keeps_caller_token() {
        let fx = fixture();
        let admin_id = create_user(&fx.users, "admin@x.com");
        let user_id = create_user(&fx.users, "a@x.com");
        let admin = fx.service.login(admin_id).unwrap();
        fx.service.login(user_id).unwrap();
        fx.service.login(user_id).unwrap();

        let directive = fx.service.logout(Some(&admin.identity), Some(user_id)).unwrap();
        assert_eq!(directive, None);
        assert_eq!(fx.sessions.count_for_user(user_id).unwrap(), 0);
        assert_eq!(fx.sessions.count_for_user(admin_id).unwrap(), 1);

        let directive = fx.service.logout(Some(&admin.identity), Some(admin_id)).unwrap();
        assert_eq!(directive, Some(TokenDirective::Clear));
    }

    #[test]
    fn test_logout_without_identity_still_clears() {
        let fx = fixture();
        assert_eq!(
            fx.service.logout(None, None).unwrap(),
            Some(TokenDirective::Clear)
        );
        assert!(fx.service.revocations().is_empty());
    }

    #[test]
    fn test_infinite_sessions() {
        let db = NamedTempFile::new().unwrap();
        let path = db.path().to_str().unwrap();
        let users = Arc::new(UserStore::new(path, 4, None).unwrap());
        let sessions = Arc::new(SessionStore::new(path).unwrap());
        let config = AuthConfig {
            session_max_age: None,
            session_key_cost: 4,
            ..AuthConfig::default()
        };
        let service = AuthService::new(config, sessions, users.clone());
        let user_id = create_user(&users, "a@x.com");
        let t0 = Utc::now();
        let auth = service.login_at(user_id, t0).unwrap();

        let later = t0 + Duration::days(30);
        let refreshed = valid(service.validate_token_at(&token_of(&auth), later).unwrap());
        assert_eq!(refreshed.identity.user_id, user_id);
    }

    #[test]
    fn test_extract_prefers_bearer_header() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            RequestAuth::extract(&headers, true),
            RequestAuth::Unauthenticated
        ));

        headers.insert(header::COOKIE, HeaderValue::from_static("a=b; token=from-cookie"));
        assert!(matches!(
            RequestAuth::extract(&headers, true),
            RequestAuth::TokenPresented(ref t) if t == "from-cookie"
        ));
        assert!(matches!(
            RequestAuth::extract(&headers, false),
            RequestAuth::Unauthenticated
        ));

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert!(matches!(
            RequestAuth::extract(&headers, true),
            RequestAuth::TokenPresented(ref t) if t == "from-header"
        ));
    }

    #[test]
    fn test_state_machine_advance() {
        let fx = fixture();
        let user_id = create_user(&fx.users, "a@x.com");
        let auth = fx.service.login(user_id).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token_of(&auth))).unwrap(),
        );
        let state = RequestAuth::extract(&headers, true)
            .advance(&fx.service)
            .unwrap();
        assert_eq!(state.identity().map(|i| i.user_id), Some(user_id));
        assert!(state.directive().is_none());

        let unauthenticated = RequestAuth::Unauthenticated.advance(&fx.service).unwrap();
        assert!(unauthenticated.identity().is_none());
    }
}
