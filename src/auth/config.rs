//! Authentication settings.

use chrono::Duration;

/// Name of the cookie carrying the access token.
pub const TOKEN_COOKIE: &str = "token";
/// Response header carrying a freshly issued token (or `"logout"`).
pub const SET_AUTH_TOKEN_HEADER: &str = "x-set-auth-token";
/// Sentinel written to the header and cookie on logout.
pub const LOGOUT_SENTINEL: &str = "logout";

/// Lifetimes and switches for the auth core.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Access token lifetime.
    pub access_token_ttl: Duration,
    /// How long a signing secret stays primary.
    pub rolling_secret_timeout: Duration,
    /// Session lifetime; `None` is infinite.
    pub session_max_age: Option<Duration>,
    /// Also deliver tokens through the `token` cookie.
    pub use_cookies: bool,
    /// bcrypt cost for hashing session keys.
    pub session_key_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::minutes(15),
            rolling_secret_timeout: Duration::hours(1),
            session_max_age: Some(Duration::hours(24)),
            use_cookies: true,
            session_key_cost: bcrypt::DEFAULT_COST,
        }
    }
}
