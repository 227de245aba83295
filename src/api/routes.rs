//! HTTP Router
//! Mission: Compose public, user and admin route groups around the auth core

use crate::auth::{
    api::{self as auth_api, AuthState},
    middleware::{auth_middleware, require_admin, require_user},
};
use crate::middleware::request_logging_simple;
use axum::{
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Build the application router.
///
/// Gated groups run `auth_middleware` first, then their role check, so a
/// missing identity is a 401 before any handler runs.
pub fn create_router(state: AuthState, cors_enabled: bool) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/user/register", post(auth_api::register))
        .route("/user/login", post(auth_api::login))
        .with_state(state.clone());

    let user_routes = Router::new()
        .route("/user/logout", get(auth_api::logout))
        .route("/user/me", get(auth_api::get_current_user))
        .route("/user/update", post(auth_api::update_user))
        .route("/user/delete", post(auth_api::delete_user))
        .route_layer(middleware::from_fn(require_user))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/users", get(auth_api::list_users))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn(request_logging_simple))
        .layer(TraceLayer::new_for_http());

    if cors_enabled {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}
