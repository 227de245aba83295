//! Authentication API Endpoints
//! Mission: Login, logout and user account management

use crate::auth::{
    middleware::{apply_directive, CurrentUser},
    models::{
        DeleteUserRequest, LoginRequest, LoginResponse, MessageResponse, RegisterRequest, Role,
        UpdateUserRequest, UserResponse,
    },
    service::{AuthService, TokenDirective, UpdatedUser},
    user_store::{NewUser, UserChanges, UserStore},
};
use crate::error::ApiError;
use crate::locks::{NamedLocks, USER_WRITE_LOCK};
use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::WithRejection;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub users: Arc<UserStore>,
    pub auth: Arc<AuthService>,
    pub locks: Arc<NamedLocks>,
}

impl AuthState {
    pub fn new(users: Arc<UserStore>, auth: Arc<AuthService>) -> Self {
        Self {
            users,
            auth,
            locks: Arc::new(NamedLocks::new()),
        }
    }

    fn token_headers(&self, directive: Option<TokenDirective>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(directive) = directive {
            apply_directive(&mut headers, &directive, self.auth.config());
        }
        headers
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::validation(format!("\"{field}\" is required")))
}

fn non_empty(value: String, field: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!(
            "\"{field}\" is not allowed to be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn user_not_found(user_id: i64) -> ApiError {
    ApiError::not_found(format!("User with id {user_id} not found."))
}

fn duplicate_email() -> ApiError {
    ApiError::validation("An account with this email already exists.")
}

/// Register endpoint - POST /user/register
pub async fn register(
    State(state): State<AuthState>,
    WithRejection(Json(payload), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> Result<Json<UserResponse>, ApiError> {
    let email = non_empty(required(payload.email, "email")?, "email")?;
    let password = required(payload.password, "password")?;
    let repeat_password = required(payload.repeat_password, "repeatPassword")?;
    if password != repeat_password {
        return Err(ApiError::validation("Repeated password does not match."));
    }

    let _guard = state.locks.acquire(USER_WRITE_LOCK).await;
    if state.users.email_taken(&email, None)? {
        return Err(duplicate_email());
    }

    let user = state.users.create_user(&NewUser {
        email,
        password: Some(password),
        role: Role::User,
        first_name: payload.first_name.unwrap_or_default(),
        last_name: payload.last_name.unwrap_or_default(),
    })?;

    info!("Registered user {} ({})", user.id, user.email);
    Ok(Json(UserResponse::from_user(&user, None)))
}

/// Login endpoint - POST /user/login
pub async fn login(
    State(state): State<AuthState>,
    WithRejection(Json(payload), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<Response, ApiError> {
    let email = non_empty(required(payload.email, "email")?, "email")?;
    let password = required(payload.password, "password")?;

    let Some(user) = state.users.check_credentials(&email, &password)? else {
        warn!("Failed login attempt: {}", email);
        return Err(ApiError::Credentials);
    };

    let auth = state.auth.login(user.id)?;
    let token = auth
        .issued_token
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("login issued no token")))?;

    info!("Login successful: {} ({})", user.email, user.role);

    let headers = state.token_headers(Some(TokenDirective::Set(token.clone())));
    let body = LoginResponse {
        message: "Login successful.".to_string(),
        token,
        user: UserResponse::from_user(&user, Some(user.id)),
    };
    Ok((headers, Json(body)).into_response())
}

/// Logout endpoint - GET /user/logout
pub async fn logout(
    State(state): State<AuthState>,
    CurrentUser(me): CurrentUser,
) -> Result<Response, ApiError> {
    let directive = state.auth.logout(Some(&me), None)?;
    let headers = state.token_headers(directive);
    Ok((headers, Json(MessageResponse::new("Logout successful."))).into_response())
}

/// Current user - GET /user/me
pub async fn get_current_user(
    State(state): State<AuthState>,
    CurrentUser(me): CurrentUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .users
        .get_user(me.user_id)?
        .ok_or_else(|| user_not_found(me.user_id))?;
    Ok(Json(UserResponse::from_user(&user, Some(me.user_id))))
}

/// Update user - POST /user/update
///
/// Users may edit their own account; admins may edit any account and are the
/// only ones allowed to change roles. A role change ends every session of the
/// target user so tokens carrying the old role stop working.
pub async fn update_user(
    State(state): State<AuthState>,
    CurrentUser(me): CurrentUser,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateUserRequest>, ApiError>,
) -> Result<Response, ApiError> {
    let user_id = required(payload.id, "id")?;

    let _guard = state.locks.acquire(USER_WRITE_LOCK).await;
    if state.users.get_user(user_id)?.is_none() {
        return Err(user_not_found(user_id));
    }

    if !me.is_admin() && me.user_id != user_id {
        return Err(ApiError::Forbidden);
    }

    let role = match payload.role.as_deref() {
        None => None,
        Some(_) if !me.is_admin() => {
            return Err(ApiError::validation(
                "Only admins have the permission to change other user's role.",
            ))
        }
        Some(name) => Some(
            Role::from_name(name)
                .ok_or_else(|| ApiError::validation(format!("Role \"{name}\" does not exist.")))?,
        ),
    };

    let email = payload
        .email
        .map(|email| non_empty(email, "email"))
        .transpose()?;
    if let Some(email) = &email {
        if state.users.email_taken(email, Some(user_id))? {
            return Err(duplicate_email());
        }
    }

    let changes = UserChanges {
        email,
        password: payload.password,
        role,
        first_name: payload.first_name,
        last_name: payload.last_name,
    };
    let UpdatedUser { user, directive } = state
        .auth
        .update_user(Some(&me), user_id, &changes)?
        .ok_or_else(|| user_not_found(user_id))?;

    let headers = state.token_headers(directive);
    Ok((headers, Json(UserResponse::from_user(&user, Some(me.user_id)))).into_response())
}

/// Delete user - POST /user/delete
pub async fn delete_user(
    State(state): State<AuthState>,
    CurrentUser(me): CurrentUser,
    WithRejection(Json(payload), _): WithRejection<Json<DeleteUserRequest>, ApiError>,
) -> Result<Response, ApiError> {
    let user_id = required(payload.id, "id")?;

    let _guard = state.locks.acquire(USER_WRITE_LOCK).await;
    if state.users.get_user(user_id)?.is_none() {
        return Err(user_not_found(user_id));
    }
    if !me.is_admin() && me.user_id != user_id {
        return Err(ApiError::Forbidden);
    }

    state.users.delete_user(user_id)?;
    let directive = state.auth.logout(Some(&me), Some(user_id))?;

    info!("User {} deleted by {}", user_id, me.user_id);
    let headers = state.token_headers(directive);
    Ok((headers, Json(MessageResponse::new("Account successfully deleted."))).into_response())
}

/// List all users - GET /users (Admin only)
pub async fn list_users(
    State(state): State<AuthState>,
    CurrentUser(me): CurrentUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.users.list_users()?;
    let response = users
        .iter()
        .map(|user| UserResponse::from_user(user, Some(me.user_id)))
        .collect();
    Ok(Json(response))
}
