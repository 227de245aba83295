//! Authentication Module
//! Mission: Session-backed access tokens with rolling secrets, revocation and RBAC

pub mod api;
pub mod config;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod revocation;
pub mod rolling;
pub mod secret;
pub mod service;
pub mod session_store;
pub mod user_store;

pub use api::AuthState;
pub use config::{AuthConfig, SET_AUTH_TOKEN_HEADER, TOKEN_COOKIE};
pub use middleware::{auth_middleware, authorize, require_admin, require_user, CurrentUser};
pub use models::{AuthenticatedIdentity, Role};
pub use service::{AuthService, RequestAuth, TokenDirective};
pub use session_store::SessionStore;
pub use user_store::UserStore;
