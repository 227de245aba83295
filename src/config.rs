//! Runtime configuration from flags and environment.

use crate::auth::{config::AuthConfig, user_store::AdminSeed};
use clap::{ArgAction, Parser};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone)]
#[command(name = "rollgate")]
#[command(about = "Session-backed token authentication service")]
pub struct Args {
    /// Address to bind
    #[arg(long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind
    #[arg(long, env = "SERVER_PORT", default_value = "3000")]
    pub port: u16,

    /// SQLite database file; relative paths are anchored at the crate directory
    #[arg(long, env = "DB_PATH", default_value = "rollgate.db")]
    pub db_path: String,

    /// Allow cross-origin requests from anywhere
    #[arg(long, env = "CORS_ENABLED", default_value_t = false, action = ArgAction::Set)]
    pub cors_enabled: bool,

    /// Access token lifetime in seconds
    #[arg(long, env = "ACCESS_TOKEN_TTL_SECS", default_value = "900")]
    pub access_token_ttl_secs: u32,

    /// How long a signing secret stays primary, in seconds
    #[arg(long, env = "ROLLING_SECRET_TIMEOUT_SECS", default_value = "3600")]
    pub rolling_secret_timeout_secs: u32,

    /// Session lifetime in seconds (0 = never expires)
    #[arg(long, env = "SESSION_MAX_AGE_SECS", default_value = "86400")]
    pub session_max_age_secs: u32,

    /// Deliver tokens through the `token` cookie as well as the header
    #[arg(long, env = "USE_COOKIES", default_value_t = true, action = ArgAction::Set)]
    pub use_cookies: bool,

    /// bcrypt cost for session keys
    #[arg(long, env = "SESSION_KEY_COST", default_value = "10")]
    pub session_key_cost: u32,

    /// bcrypt cost for account passwords
    #[arg(long, env = "PASSWORD_COST", default_value = "10")]
    pub password_cost: u32,

    /// Email of the admin account seeded when none exists
    #[arg(long, env = "ADMIN_EMAIL", default_value = "admin@example.com")]
    pub admin_email: String,

    /// Password of the seeded admin account
    #[arg(long, env = "ADMIN_PASSWORD", default_value = "admin123", hide_env_values = true)]
    pub admin_password: String,
}

impl Args {
    pub fn auth_config(&self) -> AuthConfig {
        let seconds = |secs: u32| chrono::Duration::seconds(i64::from(secs));
        AuthConfig {
            access_token_ttl: seconds(self.access_token_ttl_secs),
            rolling_secret_timeout: seconds(self.rolling_secret_timeout_secs),
            session_max_age: (self.session_max_age_secs > 0)
                .then(|| seconds(self.session_max_age_secs)),
            use_cookies: self.use_cookies,
            session_key_cost: self.session_key_cost,
        }
    }

    pub fn admin_seed(&self) -> AdminSeed {
        AdminSeed {
            email: self.admin_email.clone(),
            password: self.admin_password.clone(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn database_path(&self) -> String {
        resolve_data_path(&self.db_path, Path::new(env!("CARGO_MANIFEST_DIR")))
    }
}

/// Absolute paths are kept; relative ones are joined onto `base`.
pub fn resolve_data_path(raw: &str, base: &Path) -> String {
    let p = PathBuf::from(raw.trim());
    if p.is_absolute() {
        return p.to_string_lossy().to_string();
    }
    base.join(p).to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    /// Parse `flags` with every `env = ...` fallback unset.
    fn parse_without_env(flags: &[&str]) -> Args {
        for arg in Args::command().get_arguments() {
            if let Some(var) = arg.get_env() {
                std::env::remove_var(var);
            }
        }
        Args::parse_from(std::iter::once("rollgate").chain(flags.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let args = parse_without_env(&[]);
        let config = args.auth_config();

        assert_eq!(args.bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.access_token_ttl, chrono::Duration::minutes(15));
        assert_eq!(config.rolling_secret_timeout, chrono::Duration::hours(1));
        assert_eq!(config.session_max_age, Some(chrono::Duration::hours(24)));
        assert!(config.use_cookies);
        assert!(!args.cors_enabled);
    }

    #[test]
    fn test_zero_session_age_is_infinite() {
        let args = parse_without_env(&["--session-max-age-secs", "0", "--use-cookies", "false"]);
        let config = args.auth_config();
        assert_eq!(config.session_max_age, None);
        assert!(!config.use_cookies);
    }

    #[test]
    fn test_resolve_data_path() {
        let base = Path::new("/srv/rollgate");
        assert_eq!(resolve_data_path("/tmp/x.db", base), "/tmp/x.db");
        assert_eq!(resolve_data_path("data/x.db", base), "/srv/rollgate/data/x.db");
    }
}
