use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::models::BookingStatus;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const EXCLUSION_VIOLATION: &str = "23P01";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Cannot move booking from {from} to {to}")]
    InvalidTransition { from: BookingStatus, to: BookingStatus },
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict(message.into())
    }

    /// Wrap a failed input check from `models::validation`
    pub fn from_validation(err: anyhow::Error) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some(EXCLUSION_VIOLATION) => {
                    return ServiceError::conflict("trainer already has a booking in that time range")
                }
                Some(UNIQUE_VIOLATION) => {
                    return ServiceError::conflict("record already exists")
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    return ServiceError::validation("referenced record does not exist")
                }
                _ => {}
            }
        }
        ServiceError::Database(err)
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::Auth(err) => err.into_response(),
            other => other.render(),
        }
    }
}

impl ServiceError {
    fn render(self) -> Response {
        let (status, error_code) = match &self {
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_failed"),
            ServiceError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ServiceError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ServiceError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
            ServiceError::InvalidBody(rejection) => (rejection.status(), "invalid_body"),
            ServiceError::Auth(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ServiceError::Database(err) => {
                tracing::error!(error = %err, "database operation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let message = match &self {
            ServiceError::Database(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = vec![
            (ServiceError::NotFound("Booking"), StatusCode::NOT_FOUND),
            (ServiceError::validation("bad"), StatusCode::BAD_REQUEST),
            (ServiceError::conflict("taken"), StatusCode::CONFLICT),
            (ServiceError::forbidden("nope"), StatusCode::FORBIDDEN),
            (
                ServiceError::InvalidTransition {
                    from: BookingStatus::Completed,
                    to: BookingStatus::Pending,
                },
                StatusCode::CONFLICT,
            ),
            (
                ServiceError::Auth(AuthError::MissingAuthHeader),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ServiceError::from(sqlx::Error::RowNotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_transition_message() {
        let err = ServiceError::InvalidTransition {
            from: BookingStatus::Cancelled,
            to: BookingStatus::Confirmed,
        };
        assert_eq!(err.to_string(), "Cannot move booking from cancelled to confirmed");
    }
}
