//! Authentication Middleware
//! Mission: Bind request identities and gate route groups by role

use crate::auth::config::{AuthConfig, LOGOUT_SENTINEL, SET_AUTH_TOKEN_HEADER, TOKEN_COOKIE};
use crate::auth::jwt::TokenError;
use crate::auth::models::AuthenticatedIdentity;
use crate::auth::service::{AuthService, AuthServiceError, RequestAuth, TokenDirective};
use crate::error::ApiError;
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

/// Roles allowed on the `user` route group.
pub const USER_ROLES: &[&str] = &["user", "admin"];
/// Roles allowed on the `admin` route group.
pub const ADMIN_ROLES: &[&str] = &["admin"];

/// Validates the presented token (if any) and binds the identity into request
/// extensions. Never rejects on its own; a refreshed token is written to the
/// response unless the handler already set one.
pub async fn auth_middleware(
    State(auth): State<Arc<AuthService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let state = RequestAuth::extract(req.headers(), auth.config().use_cookies);

    let validator = auth.clone();
    let state = tokio::task::spawn_blocking(move || state.advance(&validator))
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;

    let state = match state {
        Ok(state) => state,
        Err(AuthServiceError::Token(TokenError::Malformed(reason))) => {
            warn!("Unexpected token verification failure: {}", reason);
            RequestAuth::Unauthenticated
        }
        Err(e) => return Err(e.into()),
    };

    let directive = state.directive();
    if let Some(identity) = state.identity() {
        req.extensions_mut().insert(identity.clone());
    }

    let mut response = next.run(req).await;

    if let Some(directive) = directive {
        if !response.headers().contains_key(SET_AUTH_TOKEN_HEADER) {
            apply_directive(response.headers_mut(), &directive, auth.config());
        }
    }

    Ok(response)
}

/// Write the token header and, when enabled, the `token` cookie.
pub fn apply_directive(headers: &mut HeaderMap, directive: &TokenDirective, config: &AuthConfig) {
    let (value, cookie) = match directive {
        TokenDirective::Set(token) => {
            let mut cookie = format!("{TOKEN_COOKIE}={token}; Path=/; HttpOnly");
            // Infinite sessions get a browser-session cookie.
            if let Some(max_age) = config.session_max_age {
                cookie.push_str(&format!("; Max-Age={}", max_age.num_seconds()));
            }
            (token.as_str(), cookie)
        }
        TokenDirective::Clear => (
            LOGOUT_SENTINEL,
            format!("{TOKEN_COOKIE}={LOGOUT_SENTINEL}; Path=/; HttpOnly; Max-Age=0"),
        ),
    };

    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(SET_AUTH_TOKEN_HEADER, value);
        }
        Err(e) => warn!("Cannot encode auth token header: {}", e),
    }

    if config.use_cookies {
        match HeaderValue::from_str(&cookie) {
            Ok(cookie) => {
                headers.append(header::SET_COOKIE, cookie);
            }
            Err(e) => warn!("Cannot encode auth cookie: {}", e),
        }
    }
}

/// Access requirement of a route.
#[derive(Debug, Clone, Copy)]
pub enum Requirement<'a> {
    Authenticated,
    /// Role names from the closed set `{user, admin}`.
    AnyRole(&'a [&'a str]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzError {
    Unauthorized,
    Forbidden,
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Unauthorized => ApiError::Unauthorized,
            AuthzError::Forbidden => ApiError::Forbidden,
        }
    }
}

/// Decide access for a bound identity.
///
/// # Panics
///
/// Panics if the requirement names a role outside the closed set.
pub fn authorize(
    identity: Option<&AuthenticatedIdentity>,
    requirement: Requirement<'_>,
) -> Result<(), AuthzError> {
    let identity = identity.ok_or(AuthzError::Unauthorized)?;
    match requirement {
        Requirement::Authenticated => Ok(()),
        Requirement::AnyRole(roles) if identity.has_any_role(roles) => Ok(()),
        Requirement::AnyRole(_) => Err(AuthzError::Forbidden),
    }
}

fn guard(req: &Request, requirement: Requirement<'_>) -> Result<(), ApiError> {
    authorize(req.extensions().get::<AuthenticatedIdentity>(), requirement)?;
    Ok(())
}

/// Gate for the `user` group. Layer it inside `auth_middleware`.
pub async fn require_user(req: Request, next: Next) -> Result<Response, ApiError> {
    guard(&req, Requirement::AnyRole(USER_ROLES))?;
    Ok(next.run(req).await)
}

/// Gate for the `admin` group. Layer it inside `auth_middleware`.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    guard(&req, Requirement::AnyRole(ADMIN_ROLES))?;
    Ok(next.run(req).await)
}

/// Identity bound by `auth_middleware`; rejects with 401 when absent.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedIdentity>()
            .cloned()
            .map(CurrentUser)
            .ok_or(ApiError::Unauthorized)
    }
}
