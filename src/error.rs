//! HTTP error taxonomy.
//!
//! Every failure leaves the API as `{"message": "..."}`. Missing resources map
//! to 400, not 404; clients depend on that.

use crate::auth::service::AuthServiceError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

pub const UNAUTHORIZED_MESSAGE: &str = "Not authorized. Please login.";
pub const FORBIDDEN_MESSAGE: &str =
    "Forbidden. You are missing the permission to perform this action.";
pub const CREDENTIALS_MESSAGE: &str = "Credentials are incorrect.";

#[derive(Debug)]
pub enum ApiError {
    /// Malformed input, with a field-specific message.
    Validation(String),
    /// Unknown email or wrong password; deliberately generic.
    Credentials,
    Unauthorized,
    Forbidden,
    NotFound(String),
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Credentials | ApiError::NotFound(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Validation(message) | ApiError::NotFound(message) => message,
            ApiError::Credentials => CREDENTIALS_MESSAGE.to_string(),
            ApiError::Unauthorized => UNAUTHORIZED_MESSAGE.to_string(),
            ApiError::Forbidden => FORBIDDEN_MESSAGE.to_string(),
            ApiError::Internal(err) => {
                error!("Internal error: {:#}", err);
                "Internal server error".to_string()
            }
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<AuthServiceError> for ApiError {
    fn from(err: AuthServiceError) -> Self {
        match err {
            AuthServiceError::UnknownUser(_) => ApiError::Credentials,
            other => ApiError::Internal(other.into()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}
