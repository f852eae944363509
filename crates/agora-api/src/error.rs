//! Error types for backend requests.
//!
//! An [`ApiError`] is produced once, at the transport boundary, and carries
//! everything later stages need (status code, body) by value. Every stage
//! that reports to the user converts the failure into
//! [`ApiError::AlreadyHandled`] so that exactly one banner is shown per
//! failure.

use agora_config_and_utils::notify::{Banner, Notifier};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Title of the catch-all banner shown by callers.
pub const GENERIC_ERROR_TITLE: &str = "Something went wrong";

/// HTTP statuses retried with constant backoff.
pub const TRANSIENT_STATUSES: [u16; 4] = [408, 502, 503, 504];

/// Failure of a backend request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// A lower layer has already told the user. Callers must stay silent.
    #[error("already reported to the user")]
    AlreadyHandled,

    /// Response status outside the endpoint's success set. The body never
    /// appears in the rendered message, only its summary.
    #[error("HTTP {status} (body {})", summarize_body(.body))]
    Status {
        /// The HTTP status code returned by the backend.
        status: u16,
        /// Raw response body, used for throttle parsing and diagnostics.
        body: String,
    },

    /// The request never reached the server (offline, DNS, connect, timeout).
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// Any other transport-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body did not match the endpoint's schema.
    #[error("decode error: {0}")]
    Decode(String),

    /// Credentials were rejected or the token response was unusable.
    #[error("login failed")]
    LoginFailed,

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// Log-safe stand-in for a response body: `len=<bytes>,digest=<sha256 prefix>`.
pub fn summarize_body(body: &str) -> String {
    let digest = Sha256::digest(body.as_bytes());
    format!("len={},digest={}", body.len(), hex::encode(&digest[..6]))
}

/// Coarse classification consulted by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AlreadyHandled,
    Throttled,
    Connectivity,
    Transient,
    AuthExpired,
    Generic,
}

/// Convenience Result type alias for backend requests.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyHandled => ErrorKind::AlreadyHandled,
            Self::Status { status: 429, .. } => ErrorKind::Throttled,
            Self::Status { status: 401, .. } => ErrorKind::AuthExpired,
            Self::Status { status, .. } if TRANSIENT_STATUSES.contains(status) => {
                ErrorKind::Transient
            }
            Self::Connectivity(_) => ErrorKind::Connectivity,
            Self::Status { .. }
            | Self::Transport(_)
            | Self::Decode(_)
            | Self::LoginFailed
            | Self::InvalidUrl(_) => ErrorKind::Generic,
        }
    }

    pub fn is_already_handled(&self) -> bool {
        matches!(self, Self::AlreadyHandled)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short explanation suitable for a banner subtitle.
    pub fn user_message(&self) -> String {
        match self {
            Self::LoginFailed => "Check your email and password and try again".to_string(),
            Self::Connectivity(_) => "Check your internet connection".to_string(),
            Self::Status { status, .. } => format!("The server responded with status {}", status),
            Self::Decode(_) => "The server sent an unexpected response".to_string(),
            Self::AlreadyHandled | Self::Transport(_) | Self::InvalidUrl(_) => {
                "Please try again".to_string()
            }
        }
    }

    fn banner(&self) -> Banner {
        Banner::error(GENERIC_ERROR_TITLE).with_subtitle(self.user_message())
    }

    /// Show the generic banner unless the failure was already reported.
    /// Returns whether a banner was shown.
    pub fn report(&self, notifier: &dyn Notifier) -> bool {
        if self.is_already_handled() {
            return false;
        }
        tracing::warn!(error = %self, "Reporting unhandled request failure");
        notifier.show(self.banner());
        true
    }

    /// Like [`report`](Self::report), with a "Retry" action bound to `retry`.
    pub fn report_with_retry(
        &self,
        notifier: &dyn Notifier,
        retry: impl FnOnce() + Send + 'static,
    ) -> bool {
        if self.is_already_handled() {
            return false;
        }
        tracing::warn!(error = %self, "Reporting retryable request failure");
        notifier.show(self.banner().with_action("Retry", retry));
        true
    }
}
