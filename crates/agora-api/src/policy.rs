//! Retry decisions for failed requests.
//!
//! The policy is a pure function of the error and what has already been
//! tried for the current request. The request loop in
//! [`NetworkClient`](crate::NetworkClient) carries out the decision.

use crate::throttle::throttle_message;
use crate::{ApiError, ErrorKind};
use agora_config_and_utils::Config;
use std::time::Duration;

/// Per-request bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptState {
    /// Transient-status retries already performed.
    pub transient_retries: u32,
    /// Whether the one allowed token refresh has been used.
    pub refreshed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Show the wait banner (subtitle attached) and fail as handled.
    ReportThrottle(String),
    /// Ask the user whether to resubmit.
    PromptConnectivity,
    /// Sleep, then resubmit.
    WaitThenRetry(Duration),
    /// Refresh the access token, then resubmit once.
    RefreshThenRetry,
    /// Hand the error to the caller.
    GiveUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_transient_retries: u32,
    pub transient_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_transient_retries: config.transient_retry_attempts,
            transient_interval: config.transient_retry_interval(),
        }
    }

    /// Throttle and connectivity are checked before any automatic retry so a
    /// rate-limited or offline request is never silently resubmitted.
    pub fn decide(&self, error: &ApiError, state: &AttemptState) -> RetryDecision {
        match (error.kind(), error) {
            (ErrorKind::AlreadyHandled, _) => RetryDecision::GiveUp,
            (ErrorKind::Throttled, ApiError::Status { body, .. }) => {
                RetryDecision::ReportThrottle(throttle_message(body))
            }
            (ErrorKind::Connectivity, _) => RetryDecision::PromptConnectivity,
            (ErrorKind::Transient, _) if state.transient_retries < self.max_transient_retries => {
                RetryDecision::WaitThenRetry(self.transient_interval)
            }
            (ErrorKind::AuthExpired, _) if !state.refreshed => RetryDecision::RefreshThenRetry,
            _ => RetryDecision::GiveUp,
        }
    }
}
