/// Unified error types for Pollbox
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum PollError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No session credential presented
    #[error("Authentication required")]
    Unauthorized,

    /// Session token is invalid or past expiry
    #[error("Session is invalid or has expired")]
    SessionExpired,

    /// Generic credential failure. Covers both unknown-account and
    /// wrong-password so responses carry no enumeration signal.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Too many failed login attempts for this client/identity pair
    #[error("Too many failed login attempts, try again in {remaining_ms} ms")]
    Locked { remaining_ms: i64 },

    /// Request volume throttling tripped
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Generic registration failure; the real cause is logged server-side
    #[error("Unable to create an account with the provided details")]
    RegistrationFailed,

    /// Premium flag required on the account
    #[error("A premium subscription is required")]
    PremiumRequired,

    /// Owner role required
    #[error("Owner access is required")]
    OwnerRequired,

    /// A vote already exists for this (question, voter) pair
    #[error("You have already voted on this question")]
    AlreadyVoted,

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict errors
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_ms: Option<i64>,
}

/// Convert PollError to HTTP response
impl IntoResponse for PollError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            PollError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            PollError::SessionExpired => (
                StatusCode::UNAUTHORIZED,
                "SessionExpired",
                self.to_string(),
            ),
            PollError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "InvalidCredentials",
                self.to_string(),
            ),
            PollError::Locked { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "Locked",
                self.to_string(),
            ),
            PollError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "RateLimitExceeded",
                self.to_string(),
            ),
            PollError::RegistrationFailed => (
                StatusCode::BAD_REQUEST,
                "RegistrationFailed",
                self.to_string(),
            ),
            PollError::PremiumRequired => (
                StatusCode::FORBIDDEN,
                "PremiumRequired",
                self.to_string(),
            ),
            PollError::OwnerRequired => (
                StatusCode::FORBIDDEN,
                "OwnerRequired",
                self.to_string(),
            ),
            PollError::AlreadyVoted => (
                StatusCode::CONFLICT,
                "AlreadyVoted",
                self.to_string(),
            ),
            PollError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "NotFound",
                self.to_string(),
            ),
            PollError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            PollError::Conflict(_) => (
                StatusCode::CONFLICT,
                "Conflict",
                self.to_string(),
            ),
            PollError::Database(_) | PollError::Internal(_) | PollError::Io(_) => {
                tracing::error!("internal error: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalServerError",
                    "Internal server error".to_string(), // Don't leak details
                )
            }
        };

        let remaining_ms = match &self {
            PollError::Locked { remaining_ms } => Some(*remaining_ms),
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            remaining_ms,
        });

        (status, body).into_response()
    }
}

/// Result type alias for Pollbox operations
pub type PollResult<T> = Result<T, PollError>;
