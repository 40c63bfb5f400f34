//! Error classification for platform and network failures
//!
//! Failures are sorted into a small set of categories by a flat
//! status-code mapping and carry both a detailed message (for logs)
//! and a short user-facing message (for the CLI). Most failures are
//! not retried.

use thiserror::Error;

/// Category of a classified failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input was rejected before or by the platform (422)
    Validation,
    /// A media upload was rejected (413)
    Upload,
    /// The request never reached the platform
    Network,
    /// Credentials were rejected (401/403)
    Auth,
    /// Too many requests (429)
    RateLimit,
    /// The platform is having trouble (5xx)
    Server,
    /// Anything else
    Unknown,
}

impl ErrorKind {
    /// Short label for logs
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Upload => "upload",
            Self::Network => "network",
            Self::Auth => "auth",
            Self::RateLimit => "rate-limit",
            Self::Server => "server",
            Self::Unknown => "unknown",
        }
    }
}

/// A classified application error
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AppError {
    /// Failure category
    pub kind: ErrorKind,
    /// Detailed message for logging
    pub message: String,
    /// Short message suitable for showing the user
    pub user_message: String,
}

impl AppError {
    /// Build an error in a given category
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let user_message = default_user_message(kind).to_string();
        Self {
            kind,
            message,
            user_message,
        }
    }

    /// Build a validation error with its own user-facing text
    pub fn validation(message: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
            user_message: user_message.into(),
        }
    }
}

/// Classify an HTTP status code
pub fn classify_status(status: reqwest::StatusCode) -> ErrorKind {
    match status.as_u16() {
        401 | 403 => ErrorKind::Auth,
        413 => ErrorKind::Upload,
        422 => ErrorKind::Validation,
        429 => ErrorKind::RateLimit,
        s if s >= 500 => ErrorKind::Server,
        _ => ErrorKind::Unknown,
    }
}

/// Classify a transport-level error from reqwest
pub fn classify_transport(error: &reqwest::Error) -> ErrorKind {
    if let Some(status) = error.status() {
        classify_status(status)
    } else if error.is_timeout() || error.is_connect() || error.is_request() {
        ErrorKind::Network
    } else {
        ErrorKind::Unknown
    }
}

/// Build an `AppError` from a failed HTTP response
pub fn from_response(status: reqwest::StatusCode, body: &str) -> AppError {
    let kind = classify_status(status);
    AppError::new(kind, format!("HTTP {status}: {body}"))
}

/// The user-facing message for each category
const fn default_user_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => {
            "Please check your input and try again. Some fields may be missing or invalid."
        }
        ErrorKind::Upload => "One or more files are too large. Please reduce file size and try again.",
        ErrorKind::Network => {
            "Unable to connect to the server. Please check your internet connection and try again."
        }
        ErrorKind::Auth => "Your session has expired. Please link this account again.",
        ErrorKind::RateLimit => "You are posting too frequently. Please wait a moment and try again.",
        ErrorKind::Server => "The server is experiencing issues. Please try again in a few minutes.",
        ErrorKind::Unknown => "An unexpected error occurred. Please try again.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_status_classification() {
        assert_eq!(classify_status(StatusCode::UNAUTHORIZED), ErrorKind::Auth);
        assert_eq!(classify_status(StatusCode::FORBIDDEN), ErrorKind::Auth);
        assert_eq!(classify_status(StatusCode::PAYLOAD_TOO_LARGE), ErrorKind::Upload);
        assert_eq!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY),
            ErrorKind::Validation
        );
        assert_eq!(classify_status(StatusCode::TOO_MANY_REQUESTS), ErrorKind::RateLimit);
        assert_eq!(classify_status(StatusCode::BAD_GATEWAY), ErrorKind::Server);
        assert_eq!(classify_status(StatusCode::NOT_FOUND), ErrorKind::Unknown);
    }

    #[test]
    fn test_from_response_keeps_body() {
        let err = from_response(StatusCode::UNPROCESSABLE_ENTITY, "missing field");
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("missing field"));
        assert!(err.user_message.contains("check your input"));
    }

    #[test]
    fn test_validation_custom_user_message() {
        let err = AppError::validation("empty post", "Please add a message before posting.");
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.user_message, "Please add a message before posting.");
    }
}
