//! Error types shared across the login flow.
//!
//! `ApiError` (transport and status failures) lives in [`crate::api`]; this
//! module holds the storage and authentication outcomes built on top of it.

use thiserror::Error;

use crate::api::ApiError;

/// Failure of a token store or one of its durable backends.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Token file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored token is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keychain(#[from] keyring::Error),

    #[error("Token store lock poisoned")]
    Poisoned,
}

/// Why a login attempt did not produce a session.
///
/// Every variant is recoverable by retrying; none of them touch stored
/// token state or trigger navigation.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Login request failed: {0}")]
    Remote(#[from] ApiError),

    #[error("Login response contained no user records")]
    EmptyResponse,

    #[error("Login response did not include a token")]
    MissingToken,

    #[error("Failed to store session token: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Short message suitable for showing next to the form.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Remote(ApiError::Unauthorized)
            | AuthError::Remote(ApiError::AccessDenied(_)) => {
                "Invalid email or password".to_string()
            }
            AuthError::Remote(ApiError::NetworkError(e)) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            AuthError::Remote(ApiError::NetworkError(e)) if e.is_connect() => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            AuthError::Remote(ApiError::RateLimited) => {
                "Too many attempts. Please wait and try again.".to_string()
            }
            other => format!("Login failed: {}", other),
        }
    }
}
