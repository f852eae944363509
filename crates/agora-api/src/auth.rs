//! Session seam consulted by the request pipeline.

use crate::ApiResult;
use async_trait::async_trait;

/// Supplies bearer tokens and performs the one-shot refresh after a 401.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Current access token, if the session has one.
    fn access_token(&self) -> Option<String>;

    /// Called at most once per request, after its first 401.
    ///
    /// `stale_token` is the token the rejected request carried. `Ok(())`
    /// means a usable token is now in place and the request should be
    /// replayed. On failure the session has already logged out and told the
    /// user, so implementations return [`ApiError::AlreadyHandled`](crate::ApiError::AlreadyHandled).
    async fn refresh_after_unauthorized(&self, stale_token: Option<String>) -> ApiResult<()>;
}
