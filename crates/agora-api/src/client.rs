//! Request execution with the retry pipeline.
//!
//! Every call goes through the same steps: attach the bearer token, send,
//! validate the status against the endpoint's success codes, and on
//! failure let [`RetryPolicy`] pick exactly one follow-up. Throttling and
//! connectivity are reported to the user here and come back as
//! [`ApiError::AlreadyHandled`]; anything else that reaches the caller is
//! theirs to report.

use crate::endpoint::decode_body;
use crate::error::summarize_body;
use crate::policy::{AttemptState, RetryDecision, RetryPolicy};
use crate::{ApiError, ApiResult, Authenticator, Endpoint, HttpRequest, Transport, TransportError};
use agora_config_and_utils::notify::{Banner, Notifier};
use agora_config_and_utils::Config;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use url::Url;

/// Title of the banner shown for HTTP 429.
pub const THROTTLED_TITLE: &str = "Too many requests";
/// Title of the banner shown when the server cannot be reached.
pub const CONNECTIVITY_TITLE: &str = "No internet connection";

pub struct NetworkClient {
    base_url: Url,
    transport: Arc<dyn Transport>,
    authenticator: Arc<dyn Authenticator>,
    notifier: Arc<dyn Notifier>,
    policy: RetryPolicy,
    connectivity_timeout: Duration,
}

impl std::fmt::Debug for NetworkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkClient")
            .field("base_url", &self.base_url.as_str())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl NetworkClient {
    pub fn new(
        config: &Config,
        transport: Arc<dyn Transport>,
        authenticator: Arc<dyn Authenticator>,
        notifier: Arc<dyn Notifier>,
    ) -> ApiResult<Self> {
        let base_url = config
            .api_base_url()
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            base_url,
            transport,
            authenticator,
            notifier,
            policy: RetryPolicy::from_config(config),
            connectivity_timeout: config.connectivity_prompt_timeout(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `endpoint` to a single result.
    pub async fn execute<E: Endpoint>(&self, endpoint: &E) -> ApiResult<E::Response> {
        let url = self
            .base_url
            .join(&endpoint.path())
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        let mut state = AttemptState::default();

        loop {
            let bearer = endpoint
                .requires_auth()
                .then(|| self.authenticator.access_token().unwrap_or_default());

            let request = HttpRequest {
                method: endpoint.method(),
                url: url.clone(),
                bearer: bearer.clone(),
                body: endpoint.body(),
            };

            let error = match self.send(request, endpoint.success_codes()).await {
                Ok(body) => return decode_body(&body),
                Err(error) => error,
            };

            match self.policy.decide(&error, &state) {
                RetryDecision::ReportThrottle(message) => {
                    warn!(url = %url, "Request throttled");
                    self.notifier
                        .show(Banner::error(THROTTLED_TITLE).with_subtitle(message));
                    return Err(ApiError::AlreadyHandled);
                }
                RetryDecision::PromptConnectivity => {
                    warn!(url = %url, error = %error, "Server unreachable");
                    if !self.prompt_connectivity().await {
                        return Err(ApiError::AlreadyHandled);
                    }
                    info!(url = %url, "Resubmitting after connectivity prompt");
                }
                RetryDecision::WaitThenRetry(interval) => {
                    state.transient_retries += 1;
                    warn!(
                        url = %url,
                        status = ?error.status(),
                        attempt = state.transient_retries,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(interval).await;
                }
                RetryDecision::RefreshThenRetry if endpoint.requires_auth() => {
                    state.refreshed = true;
                    info!(url = %url, "Access token rejected, refreshing");
                    let stale = bearer.filter(|token| !token.is_empty());
                    self.authenticator.refresh_after_unauthorized(stale).await?;
                }
                RetryDecision::RefreshThenRetry | RetryDecision::GiveUp => return Err(error),
            }
        }
    }

    async fn send(&self, request: HttpRequest, success_codes: &[u16]) -> ApiResult<String> {
        debug!(method = %request.method, url = %request.url, "Executing request");
        dispatch(self.transport.as_ref(), request, success_codes).await
    }

    /// Show the retry banner and wait for the user. True means resubmit.
    async fn prompt_connectivity(&self) -> bool {
        let (tx, rx) = oneshot::channel::<bool>();
        let tap_tx = Arc::new(Mutex::new(Some(tx)));
        let dismiss_tx = tap_tx.clone();

        let banner = Banner::error(CONNECTIVITY_TITLE)
            .with_subtitle("Check your connection and try again")
            .with_action("Retry", move || {
                if let Some(tx) = tap_tx.lock().take() {
                    let _ = tx.send(true);
                }
            })
            .on_dismiss(move || {
                if let Some(tx) = dismiss_tx.lock().take() {
                    let _ = tx.send(false);
                }
            });
        self.notifier.show(banner);

        match tokio::time::timeout(self.connectivity_timeout, rx).await {
            Ok(Ok(retry)) => retry,
            Ok(Err(_)) => false,
            Err(_) => {
                debug!("Connectivity prompt timed out");
                false
            }
        }
    }
}

/// Send `endpoint` once without bearer, retries or banners.
///
/// Used by the session for the token endpoints, whose failures it reports
/// itself.
pub async fn call_once<E: Endpoint>(
    transport: &dyn Transport,
    base_url: &Url,
    endpoint: &E,
) -> ApiResult<E::Response> {
    let url = base_url
        .join(&endpoint.path())
        .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
    let request = HttpRequest {
        method: endpoint.method(),
        url,
        bearer: None,
        body: endpoint.body(),
    };
    let body = dispatch(transport, request, endpoint.success_codes()).await?;
    decode_body(&body)
}

async fn dispatch(
    transport: &dyn Transport,
    request: HttpRequest,
    success_codes: &[u16],
) -> ApiResult<String> {
    let response = transport.send(request).await.map_err(|e| match e {
        TransportError::Connectivity(message) => ApiError::Connectivity(message),
        TransportError::Other(message) => ApiError::Transport(message),
    })?;

    if success_codes.contains(&response.status) {
        Ok(response.body)
    } else {
        debug!(
            status = response.status,
            body = %summarize_body(&response.body),
            "Unexpected response status"
        );
        Err(ApiError::Status {
            status: response.status,
            body: response.body,
        })
    }
}
