//! Authentication Models
//! Mission: Define users, roles, access-token claims and the request-bound identity

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Token type marker for access tokens.
pub const ACCESS_TOKEN_TYPE: &str = "a";

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>, // bcrypt hash - never serialize
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// User roles for RBAC. The set is closed: anything else is a programming error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "admin")]
    Admin,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::User, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access token payload.
///
/// Keys are kept short because the token travels on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Token type, `"a"` for access tokens.
    pub t: String,
    /// Session id.
    pub s: i64,
    /// Secret session key (plaintext; only its hash is stored).
    pub k: String,
    /// User id.
    pub u: Option<i64>,
    /// Created at, unix milliseconds.
    pub c: i64,
    /// Role of the user at issue time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r: Option<String>,
}

impl AccessClaims {
    pub fn session_id(&self) -> i64 {
        self.s
    }

    pub fn user_id(&self) -> Option<i64> {
        self.u
    }

    pub fn issued_at_ms(&self) -> i64 {
        self.c
    }

    pub fn is_access(&self) -> bool {
        self.t == ACCESS_TOKEN_TYPE
    }
}

/// Identity bound to a single request after successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    pub user_id: i64,
    pub roles: BTreeSet<Role>,
    pub session_id: i64,
}

impl AuthenticatedIdentity {
    /// Build the identity from validated claims. Tokens without a user are not identities.
    pub fn from_claims(claims: &AccessClaims) -> Option<Self> {
        let user_id = claims.u?;
        let roles = claims
            .r
            .as_deref()
            .and_then(Role::from_name)
            .into_iter()
            .collect();

        Some(Self {
            user_id,
            roles,
            session_id: claims.s,
        })
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Check role membership by name.
    ///
    /// # Panics
    ///
    /// Panics when a name outside the closed role set is passed; that is a
    /// typo in calling code, not a user-facing auth failure.
    pub fn has_any_role(&self, names: &[&str]) -> bool {
        names.iter().any(|name| {
            let role = Role::from_name(name)
                .unwrap_or_else(|| panic!("checked role membership for unknown role \"{name}\""));
            self.roles.contains(&role)
        })
    }

    /// Role reported to clients: the first role, or `"none"`.
    pub fn role_label(&self) -> &'static str {
        self.roles.iter().next().map(Role::as_str).unwrap_or("none")
    }
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Registration request body
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "repeatPassword")]
    pub repeat_password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Update request body; absent fields stay unchanged
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
}

/// Delete request body
#[derive(Debug, Deserialize)]
pub struct DeleteUserRequest {
    pub id: Option<i64>,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: UserResponse,
}

/// Plain `{ "message": ... }` response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// User response (sanitized)
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub is_me: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl UserResponse {
    pub fn from_user(user: &User, current_user_id: Option<i64>) -> Self {
        let first_name = user.first_name.trim().to_string();
        let last_name = user.last_name.trim().to_string();
        let full_name = format!("{} {}", first_name, last_name).trim().to_string();

        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            first_name,
            last_name,
            full_name,
            is_me: current_user_id == Some(user.id),
            created_at: user.created_at.clone(),
            updated_at: user.updated_at.clone(),
        }
    }
}
