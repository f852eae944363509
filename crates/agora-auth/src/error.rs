//! Session error types.

use agora_api::ApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Not logged in
    #[error("Not logged in")]
    NotLoggedIn,

    /// Invalid state transition in the session FSM
    #[error("Invalid session state transition: {0}")]
    InvalidStateTransition(String),

    /// Token persistence failed
    #[error("Storage error: {0}")]
    Storage(#[from] agora_storage::StorageError),

    /// Backend call failed
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

impl AuthError {
    /// Collapse into the error type callers of the request pipeline expect.
    ///
    /// Storage and state failures are not user-reportable on their own, so
    /// they surface as a failed login.
    pub fn into_api_error(self) -> ApiError {
        match self {
            AuthError::Api(error) => error,
            _ => ApiError::LoginFailed,
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
