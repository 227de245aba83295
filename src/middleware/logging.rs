//! Request logging middleware.
//!
//! One line per request with method, path, status and latency. Auth
//! failures are logged at INFO so brute-force attempts stay visible.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{debug, info, warn};

pub async fn request_logging_simple(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    // Health checks are polled constantly.
    if path == "/health" {
        return next.run(request).await;
    }

    let start = Instant::now();
    let response = next.run(request).await;
    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();
    let refreshed = response.headers().contains_key(crate::auth::SET_AUTH_TOKEN_HEADER);

    match status {
        500..=u16::MAX => warn!(
            method = %method,
            path = %path,
            status,
            latency_ms,
            "Request failed (5xx)"
        ),
        401 | 403 => info!(
            method = %method,
            path = %path,
            status,
            latency_ms,
            "Request denied"
        ),
        _ => info!(
            method = %method,
            path = %path,
            status,
            latency_ms,
            "Request completed"
        ),
    }
    if refreshed {
        debug!(path = %path, "Response carries a new auth token");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_logging_passes_response_through() {
        let app = Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/teapot", get(|| async { StatusCode::IM_A_TEAPOT }))
            .layer(middleware::from_fn(request_logging_simple));

        let health = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);

        let teapot = app
            .oneshot(Request::get("/teapot").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(teapot.status(), StatusCode::IM_A_TEAPOT);
    }
}
