//! Rollgate Backend Library
//!
//! Session-backed access tokens with rolling signing secrets, revocation and
//! role-gated routes. Exposed for the server binary and integration tests.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod locks;
pub mod middleware;

pub use api::create_router;
pub use error::ApiError;
