use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

/// Where clients without a usable session are sent.
pub const LOGIN_PATH: &str = "/login";

/// The message shown for every failed login, whichever check failed.
const INVALID_CREDENTIALS_MESSAGE: &str = "Username and/or password incorrect";

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// The username is already registered.
    #[error("Username taken")]
    DuplicateUsername,

    /// The two password fields of a signup differ.
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// No identity with this username exists.
    #[error("Unknown username")]
    UnknownUsername,

    /// The password does not match the stored hash.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Hashing could not be performed.
    #[error("Password hashing failed: {0}")]
    HashingFailure(String),

    /// The token is not bound to any live session.
    #[error("No such session")]
    NoSuchSession,

    /// The session outlived its idle timeout or absolute lifetime.
    #[error("Session expired")]
    SessionExpired,

    /// A freshly generated token is already live.
    #[error("Session token collision")]
    TokenGenerationCollision,

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl From<garde::Report> for AppError {
    fn from(report: garde::Report) -> Self {
        AppError::Validation(report.to_string())
    }
}

impl From<sonic_rs::Error> for AppError {
    fn from(err: sonic_rs::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::DuplicateUsername => {
                tracing::debug!("Signup rejected: username taken");
                (StatusCode::CONFLICT, self.to_string())
            }

            AppError::PasswordMismatch => {
                tracing::debug!("Signup rejected: passwords do not match");
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }

            AppError::UnknownUsername | AppError::InvalidCredentials => {
                tracing::warn!("Authentication failed");
                (
                    StatusCode::UNAUTHORIZED,
                    INVALID_CREDENTIALS_MESSAGE.to_string(),
                )
            }

            AppError::NoSuchSession | AppError::SessionExpired => {
                tracing::debug!("{}, redirecting to {}", self, LOGIN_PATH);
                return Redirect::to(LOGIN_PATH).into_response();
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::HashingFailure(ref msg) => {
                tracing::error!("Hashing error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }

            AppError::TokenGenerationCollision => {
                tracing::error!("Session token collision escaped the retry loop");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }

            AppError::Io(ref e) => {
                tracing::error!("IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "File system error".to_string(),
                )
            }

            AppError::Serialization(ref msg) => {
                tracing::error!("Serialization error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (
            status,
            [(http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}
