//! Rollgate - session-backed token authentication service
//! Mission: Serve login, logout and account routes behind rolling-secret JWTs

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use rollgate_backend::{
    auth::{AuthService, AuthState, SessionStore, UserStore},
    config::Args,
    create_router,
};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let args = Args::parse();
    let db_path = args.database_path();
    let auth_config = args.auth_config();

    info!("Starting Rollgate");
    info!("  Database: {}", db_path);
    info!(
        "  Access token TTL: {}s, secret rotation: {}s",
        auth_config.access_token_ttl.num_seconds(),
        auth_config.rolling_secret_timeout.num_seconds()
    );
    match auth_config.session_max_age {
        Some(age) => info!("  Session max age: {}s", age.num_seconds()),
        None => info!("  Session max age: infinite"),
    }

    let users = Arc::new(
        UserStore::new(&db_path, args.password_cost, Some(&args.admin_seed()))
            .context("Failed to open user store")?,
    );
    let sessions = Arc::new(SessionStore::new(&db_path).context("Failed to open session store")?);
    let auth = Arc::new(AuthService::new(auth_config, sessions, users.clone()));

    let app = create_router(AuthState::new(users, auth), args.cors_enabled);

    let addr = args.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Initialize tracing with an env-overridable filter
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollgate_backend=debug,rollgate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // Also try the crate directory, for runs with --manifest-path from elsewhere
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
