use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Email already exists")]
    EmailAlreadyExists,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Missing authorization header")]
    MissingAuthHeader,
    #[error("Invalid authorization header format")]
    InvalidAuthHeaderFormat,
    #[error("Insufficient permissions")]
    InsufficientPermissions,
    #[error("Account deactivated")]
    AccountDeactivated,
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("Registration rejected: {0}")]
    Registration(String),
    #[error("Password validation failed: {0}")]
    PasswordValidation(#[from] crate::auth::password::PasswordError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials"),
            AuthError::EmailAlreadyExists => (StatusCode::CONFLICT, "Email already exists"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::MissingAuthHeader => (StatusCode::UNAUTHORIZED, "Missing authorization header"),
            AuthError::InvalidAuthHeaderFormat => (StatusCode::UNAUTHORIZED, "Invalid authorization header format"),
            AuthError::InsufficientPermissions => (StatusCode::FORBIDDEN, "Insufficient permissions"),
            AuthError::AccountDeactivated => (StatusCode::FORBIDDEN, "Account deactivated"),
            AuthError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded"),
            AuthError::Registration(_) => (StatusCode::BAD_REQUEST, "Registration rejected"),
            AuthError::PasswordValidation(ref err) if err.is_policy_violation() => {
                (StatusCode::BAD_REQUEST, "Password validation failed")
            }
            AuthError::PasswordValidation(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Password processing error"),
            AuthError::Database(ref err) => {
                tracing::error!(error = %err, "database error during authentication");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            }
            AuthError::Jwt(_) => (StatusCode::UNAUTHORIZED, "Token error"),
        };

        let message = match self {
            AuthError::Database(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
            "message": message,
        }));

        (status, body).into_response()
    }
}
