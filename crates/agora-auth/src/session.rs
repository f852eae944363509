//! Session management with refresh-and-retry using FSM-based state tracking.
//!
//! The `SessionManager` owns the access/refresh token pair. The token vault
//! underneath is only a durability layer: the in-memory pair is the source
//! of truth while the process runs, and `resume_session` repopulates it on
//! start. Whether the session is active is published on a watch channel
//! that changes only when the access token appears or disappears.

use crate::auth_fsm::{SessionMachine, SessionMachineInput, SessionState};
use crate::{AuthError, AuthResult};
use agora_api::endpoints::{ObtainTokenPair, RefreshAccessToken};
use agora_api::{call_once, ApiError, ApiResult, Authenticator, Transport};
use agora_config_and_utils::notify::{Banner, Notifier};
use agora_config_and_utils::Config;
use agora_storage::{TokenPair, TokenVault};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

/// Title of the banner shown when a session ends because refresh failed.
pub const SESSION_EXPIRED_TITLE: &str = "Session expired";

/// Side effects run when the session starts or ends.
///
/// The session holds its hooks weakly; dropping the owner silently
/// disables them.
#[async_trait]
pub trait SessionHooks: Send + Sync {
    /// Runs once after a successful login, after tokens are published.
    async fn on_login(&self);

    /// Runs after tokens are cleared, for explicit and forced logouts.
    async fn on_logout(&self);
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub is_active: bool,
}

#[derive(Default)]
struct Tokens {
    access: Option<String>,
    refresh: Option<String>,
}

pub struct SessionManager {
    vault: TokenVault,
    transport: Arc<dyn Transport>,
    base_url: Url,
    notifier: Arc<dyn Notifier>,
    tokens: RwLock<Tokens>,
    fsm: Mutex<SessionMachine>,
    active: watch::Sender<bool>,
    /// Serializes refreshes so concurrent 401s mint one token.
    refresh_lock: tokio::sync::Mutex<()>,
    hooks: RwLock<Option<Weak<dyn SessionHooks>>>,
}

impl SessionManager {
    pub fn new(
        config: &Config,
        vault: TokenVault,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn Notifier>,
    ) -> ApiResult<Self> {
        let base_url = config
            .api_base_url()
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        let (active, _) = watch::channel(false);
        Ok(Self {
            vault,
            transport,
            base_url,
            notifier,
            tokens: RwLock::new(Tokens::default()),
            fsm: Mutex::new(SessionMachine::new()),
            active,
            refresh_lock: tokio::sync::Mutex::new(()),
            hooks: RwLock::new(None),
        })
    }

    /// Register the login/logout side effects.
    pub fn set_hooks(&self, hooks: Weak<dyn SessionHooks>) {
        *self.hooks.write() = Some(hooks);
    }

    pub fn is_active(&self) -> bool {
        *self.active.borrow()
    }

    /// Stream of `is_active`, notified only on absent/present flips.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.active.subscribe()
    }

    pub fn state(&self) -> SessionState {
        SessionState::from(self.fsm.lock().state())
    }

    pub fn status(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state(),
            is_active: self.is_active(),
        }
    }

    /// Restore the persisted token pair without touching the network.
    ///
    /// The access token may have expired in the meantime; that surfaces as a
    /// 401 on the first authorized request. Returns whether the session is
    /// active afterwards.
    pub async fn resume_session(&self) -> AuthResult<bool> {
        if self.is_active() {
            return Ok(true);
        }

        let Some(pair) = self.vault.load_pair()? else {
            debug!("No stored session to resume");
            return Ok(false);
        };

        self.transition(&SessionMachineInput::SessionResumed)?;
        {
            let mut tokens = self.tokens.write();
            tokens.refresh = Some(pair.refresh);
            tokens.access = Some(pair.access);
        }
        self.publish();
        info!("Resumed stored session");
        Ok(true)
    }

    /// Exchange credentials for a token pair.
    ///
    /// Every failure, whatever its cause, comes back as
    /// [`ApiError::LoginFailed`] with the session left anonymous.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<()> {
        if self.is_active() {
            info!("Replacing the current session");
            self.logout().await.map_err(AuthError::into_api_error)?;
        }

        self.transition(&SessionMachineInput::LoginAttempt)
            .map_err(AuthError::into_api_error)?;
        debug!(email = %email, "Attempting login");

        let endpoint = ObtainTokenPair {
            email: email.to_string(),
            password: password.to_string(),
        };
        let issued = match call_once(self.transport.as_ref(), &self.base_url, &endpoint).await {
            Ok(issued) => issued,
            Err(e) => {
                warn!(error = %e, "Login request failed");
                let _ = self.transition(&SessionMachineInput::LoginFailed);
                return Err(ApiError::LoginFailed);
            }
        };

        let pair = TokenPair {
            access: issued.access,
            refresh: issued.refresh,
        };
        if let Err(e) = self.vault.store_pair(&pair) {
            warn!(error = %e, "Failed to persist tokens");
            if let Err(e) = self.vault.clear_tokens() {
                warn!(error = %e, "Failed to roll back partial token write");
            }
            let _ = self.transition(&SessionMachineInput::LoginFailed);
            return Err(ApiError::LoginFailed);
        }

        self.transition(&SessionMachineInput::LoginSuccess)
            .map_err(AuthError::into_api_error)?;
        {
            let mut tokens = self.tokens.write();
            tokens.refresh = Some(pair.refresh);
            tokens.access = Some(pair.access);
        }
        self.publish();
        info!(email = %email, "Logged in");

        if let Some(hooks) = self.hooks() {
            hooks.on_login().await;
        }
        Ok(())
    }

    /// End the session: clear tokens, then run the logout hooks.
    pub async fn logout(&self) -> AuthResult<()> {
        if !self.is_active() {
            return Err(AuthError::NotLoggedIn);
        }
        self.transition(&SessionMachineInput::LogoutRequested)?;
        let result = self.end_session().await;
        info!("Logged out");
        result
    }

    /// Clear tokens, publish, finish the FSM and run `on_logout`.
    ///
    /// Memory is cleared even when the vault fails; the vault error is
    /// returned after the hooks ran.
    async fn end_session(&self) -> AuthResult<()> {
        let cleared = {
            let mut tokens = self.tokens.write();
            let cleared = self.vault.clear_tokens();
            tokens.refresh = None;
            tokens.access = None;
            cleared
        };
        self.publish();

        if self.state() == SessionState::LoggingOut {
            let _ = self.transition(&SessionMachineInput::LogoutComplete);
        }

        if let Some(hooks) = self.hooks() {
            hooks.on_logout().await;
        }
        cleared.map_err(AuthError::from)
    }

    /// Forced logout after the refresh path gave up. Shows the expiry banner.
    async fn expire(&self) {
        match self.state() {
            SessionState::Authenticated => {
                let _ = self.transition(&SessionMachineInput::LogoutRequested);
            }
            SessionState::Refreshing => {
                let _ = self.transition(&SessionMachineInput::RefreshFailed);
            }
            _ => {}
        }
        if let Err(e) = self.end_session().await {
            warn!(error = %e, "Failed to clear tokens after session expiry");
        }
        self.notifier
            .show(Banner::error(SESSION_EXPIRED_TITLE).with_subtitle("Please log in again"));
    }

    fn hooks(&self) -> Option<Arc<dyn SessionHooks>> {
        self.hooks.read().as_ref().and_then(Weak::upgrade)
    }

    fn publish(&self) {
        let is_active = self.tokens.read().access.is_some();
        let changed = self.active.send_if_modified(|current| {
            if *current == is_active {
                false
            } else {
                *current = is_active;
                true
            }
        });
        if changed {
            debug!(is_active, "Session activity changed");
        }
    }

    /// Transition the FSM, logging state changes.
    fn transition(&self, input: &SessionMachineInput) -> AuthResult<SessionState> {
        let mut fsm = self.fsm.lock();
        let old_state = SessionState::from(fsm.state());

        fsm.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                fsm.state()
            ))
        })?;

        let new_state = SessionState::from(fsm.state());
        drop(fsm);

        if old_state != new_state {
            debug!(
                old_state = ?old_state,
                new_state = ?new_state,
                "Session state transition"
            );
        }
        Ok(new_state)
    }
}

#[async_trait]
impl Authenticator for SessionManager {
    fn access_token(&self) -> Option<String> {
        self.tokens.read().access.clone()
    }

    async fn refresh_after_unauthorized(&self, stale_token: Option<String>) -> ApiResult<()> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.access_token();
        let Some(current) = current else {
            // Another request already ended the session and told the user.
            debug!("Session already ended, nothing to refresh");
            return Err(ApiError::AlreadyHandled);
        };
        if stale_token.as_deref() != Some(current.as_str()) {
            debug!("Access token already replaced, replaying");
            return Ok(());
        }

        let refresh = self.tokens.read().refresh.clone();
        let Some(refresh) = refresh else {
            warn!("Access token rejected and no refresh token held");
            self.expire().await;
            return Err(ApiError::AlreadyHandled);
        };

        if let Err(e) = self.transition(&SessionMachineInput::TokenRejected) {
            warn!(error = %e, "Refresh requested outside an active session");
            self.expire().await;
            return Err(ApiError::AlreadyHandled);
        }

        let endpoint = RefreshAccessToken { refresh };
        match call_once(self.transport.as_ref(), &self.base_url, &endpoint).await {
            Ok(response) => {
                let stored = {
                    let mut tokens = self.tokens.write();
                    let stored = self.vault.set_access_token(&response.access);
                    tokens.access = Some(response.access);
                    stored
                };
                if let Err(e) = stored {
                    warn!(error = %e, "Refreshed access token kept in memory only");
                }
                let _ = self.transition(&SessionMachineInput::RefreshSuccess);
                self.publish();
                info!("Access token refreshed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, ending session");
                self.expire().await;
                Err(ApiError::AlreadyHandled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_api::testing::ScriptedTransport;
    use agora_api::{HttpResponse, Method};
    use agora_config_and_utils::notify::RecordingNotifier;
    use agora_storage::FileStorage;
    use serde_json::json;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingHooks {
        logins: AtomicUsize,
        logouts: AtomicUsize,
    }

    #[async_trait]
    impl SessionHooks for CountingHooks {
        async fn on_login(&self) {
            self.logins.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_logout(&self) {
            self.logouts.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Harness {
        session: Arc<SessionManager>,
        transport: Arc<ScriptedTransport>,
        notifier: Arc<RecordingNotifier>,
        hooks: Arc<CountingHooks>,
        // Second handle on the same credentials file, for inspection.
        disk: TokenVault,
        _dir: TempDir,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let credentials = dir.path().join("credentials.json");
        let transport = Arc::new(ScriptedTransport::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let session = Arc::new(open_session(&credentials, transport.clone(), notifier.clone()));
        let hooks = Arc::new(CountingHooks::default());
        let weak: Weak<dyn SessionHooks> = Arc::downgrade(&hooks) as Weak<dyn SessionHooks>;
        session.set_hooks(weak);

        Harness {
            session,
            transport,
            notifier,
            hooks,
            disk: TokenVault::new(Box::new(FileStorage::new(&credentials))),
            _dir: dir,
        }
    }

    fn open_session(
        credentials: &Path,
        transport: Arc<ScriptedTransport>,
        notifier: Arc<RecordingNotifier>,
    ) -> SessionManager {
        let config = Config {
            api_base_url: "https://api.test/api/".to_string(),
            ..Config::default()
        };
        SessionManager::new(
            &config,
            TokenVault::new(Box::new(FileStorage::new(credentials))),
            transport,
            notifier,
        )
        .unwrap()
    }

    fn store(h: &Harness, access: &str, refresh: &str) {
        h.disk
            .store_pair(&TokenPair {
                access: access.into(),
                refresh: refresh.into(),
            })
            .unwrap();
    }

    fn token_pair_ok() -> HttpResponse {
        HttpResponse::json(200, json!({ "access": "acc-1", "refresh": "ref-1" }))
    }

    #[tokio::test]
    async fn test_login_stores_pair_and_activates() {
        let h = harness();
        h.transport.respond(Method::Post, "auth/token/", token_pair_ok());
        let mut rx = h.session.subscribe();

        h.session.login("a@b.c", "pw").await.unwrap();

        assert!(h.session.is_active());
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());
        assert_eq!(h.session.state(), SessionState::Authenticated);
        assert_eq!(h.session.access_token().as_deref(), Some("acc-1"));
        assert_eq!(h.disk.refresh_token().unwrap().as_deref(), Some("ref-1"));
        assert_eq!(h.disk.access_token().unwrap().as_deref(), Some("acc-1"));
        assert_eq!(h.hooks.logins.load(Ordering::SeqCst), 1);

        let request = &h.transport.requests()[0];
        assert!(request.bearer.is_none());
        assert_eq!(request.body.as_ref().unwrap()["password"], "pw");
    }

    #[tokio::test]
    async fn test_login_rejected_stays_anonymous() {
        let h = harness();
        h.transport.respond(
            Method::Post,
            "auth/token/",
            HttpResponse::json(401, json!({ "detail": "No active account" })),
        );

        let err = h.session.login("a@b.c", "wrong").await.unwrap_err();

        assert_eq!(err, ApiError::LoginFailed);
        assert!(!h.session.is_active());
        assert_eq!(h.session.state(), SessionState::Anonymous);
        assert!(h.disk.load_pair().unwrap().is_none());
        assert_eq!(h.hooks.logins.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_login_undecodable_body_fails() {
        let h = harness();
        h.transport
            .respond(Method::Post, "auth/token/", HttpResponse::json(200, json!({ "access": "x" })));

        assert_eq!(
            h.session.login("a@b.c", "pw").await.unwrap_err(),
            ApiError::LoginFailed
        );
        assert_eq!(h.session.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_login_offline_fails() {
        let h = harness();
        h.transport.fail_offline(Method::Post, "auth/token/");

        assert_eq!(
            h.session.login("a@b.c", "pw").await.unwrap_err(),
            ApiError::LoginFailed
        );
        assert_eq!(h.notifier.count(), 0);
    }

    #[tokio::test]
    async fn test_resume_without_network() {
        let h = harness();
        store(&h, "acc-0", "ref-0");

        assert!(h.session.resume_session().await.unwrap());

        assert!(h.session.is_active());
        assert_eq!(h.session.access_token().as_deref(), Some("acc-0"));
        assert_eq!(h.transport.total_requests(), 0);
        assert_eq!(h.hooks.logins.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resume_needs_both_tokens() {
        let h = harness();
        h.disk.set_access_token("acc-only").unwrap();

        assert!(!h.session.resume_session().await.unwrap());
        assert!(!h.session.is_active());
        assert_eq!(h.session.status().state, SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let h = harness();
        store(&h, "acc-0", "ref-0");
        h.session.resume_session().await.unwrap();

        h.session.logout().await.unwrap();

        assert!(!h.session.is_active());
        assert!(h.session.access_token().is_none());
        assert!(h.disk.access_token().unwrap().is_none());
        assert!(h.disk.refresh_token().unwrap().is_none());
        assert_eq!(h.session.state(), SessionState::Anonymous);
        assert_eq!(h.hooks.logouts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_logout_then_restart_stays_anonymous() {
        let h = harness();
        store(&h, "acc-0", "ref-0");
        h.session.resume_session().await.unwrap();
        h.session.logout().await.unwrap();

        assert!(!h.session.resume_session().await.unwrap());
        assert!(!h.session.is_active());

        // A fresh manager over the same credentials finds nothing to resume.
        let restarted = open_session(
            &h._dir.path().join("credentials.json"),
            h.transport.clone(),
            h.notifier.clone(),
        );
        assert!(!restarted.resume_session().await.unwrap());
        assert!(!restarted.is_active());
        assert_eq!(restarted.state(), SessionState::Anonymous);
        assert_eq!(h.transport.total_requests(), 0);
    }

    #[tokio::test]
    async fn test_logout_when_anonymous() {
        let h = harness();
        assert!(matches!(
            h.session.logout().await,
            Err(AuthError::NotLoggedIn)
        ));
        assert_eq!(h.hooks.logouts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refresh_replaces_access_token() {
        let h = harness();
        store(&h, "acc-0", "ref-0");
        h.session.resume_session().await.unwrap();
        h.transport.respond(
            Method::Post,
            "auth/token/refresh/",
            HttpResponse::json(200, json!({ "access": "acc-1" })),
        );
        let mut rx = h.session.subscribe();

        h.session
            .refresh_after_unauthorized(Some("acc-0".into()))
            .await
            .unwrap();

        assert_eq!(h.session.access_token().as_deref(), Some("acc-1"));
        assert_eq!(h.disk.access_token().unwrap().as_deref(), Some("acc-1"));
        assert_eq!(h.session.state(), SessionState::Authenticated);
        // Token swap is not an activity change.
        assert!(!rx.has_changed().unwrap());
        let body = h.transport.requests()[0].body.clone().unwrap();
        assert_eq!(body["refresh"], "ref-0");
    }

    #[tokio::test]
    async fn test_refresh_skipped_when_token_already_replaced() {
        let h = harness();
        store(&h, "acc-new", "ref-0");
        h.session.resume_session().await.unwrap();

        h.session
            .refresh_after_unauthorized(Some("acc-old".into()))
            .await
            .unwrap();

        assert_eq!(h.transport.total_requests(), 0);
        assert!(h.session.is_active());
    }

    #[tokio::test]
    async fn test_refresh_failure_expires_session() {
        let h = harness();
        store(&h, "acc-0", "ref-0");
        h.session.resume_session().await.unwrap();
        h.transport.respond(
            Method::Post,
            "auth/token/refresh/",
            HttpResponse::json(401, json!({ "detail": "Token is invalid or expired" })),
        );

        let err = h
            .session
            .refresh_after_unauthorized(Some("acc-0".into()))
            .await
            .unwrap_err();

        assert!(err.is_already_handled());
        assert!(!h.session.is_active());
        assert_eq!(h.session.state(), SessionState::Anonymous);
        assert!(h.disk.load_pair().unwrap().is_none());
        assert_eq!(h.notifier.titles(), vec![SESSION_EXPIRED_TITLE.to_string()]);
        assert_eq!(h.hooks.logouts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_without_session_is_already_handled() {
        let h = harness();

        let err = h.session.refresh_after_unauthorized(None).await.unwrap_err();

        assert!(err.is_already_handled());
        assert_eq!(h.transport.total_requests(), 0);
        assert_eq!(h.notifier.count(), 0);
        assert_eq!(h.hooks.logouts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concurrent_rejections_expire_once() {
        let h = harness();
        store(&h, "acc-0", "ref-0");
        h.session.resume_session().await.unwrap();
        h.transport.respond(
            Method::Post,
            "auth/token/refresh/",
            HttpResponse::json(401, json!({ "detail": "Token is invalid or expired" })),
        );

        let (first, second, third) = tokio::join!(
            h.session.refresh_after_unauthorized(Some("acc-0".into())),
            h.session.refresh_after_unauthorized(Some("acc-0".into())),
            h.session.refresh_after_unauthorized(Some("acc-0".into())),
        );

        for result in [first, second, third] {
            assert!(result.unwrap_err().is_already_handled());
        }
        assert_eq!(h.transport.count(Method::Post, "auth/token/refresh/"), 1);
        assert_eq!(h.notifier.titles(), vec![SESSION_EXPIRED_TITLE.to_string()]);
        assert_eq!(h.hooks.logouts.load(Ordering::SeqCst), 1);
        assert_eq!(h.session.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_dropped_hooks_are_skipped() {
        let h = harness();
        let weak = Arc::downgrade(&h.hooks);
        drop(h.hooks);
        assert!(weak.upgrade().is_none());

        h.transport.respond(Method::Post, "auth/token/", token_pair_ok());
        h.session.login("a@b.c", "pw").await.unwrap();
        assert!(h.session.is_active());
    }

    #[tokio::test]
    async fn test_login_replaces_active_session() {
        let h = harness();
        store(&h, "acc-0", "ref-0");
        h.session.resume_session().await.unwrap();
        h.transport.respond(Method::Post, "auth/token/", token_pair_ok());

        h.session.login("a@b.c", "pw").await.unwrap();

        assert_eq!(h.hooks.logouts.load(Ordering::SeqCst), 1);
        assert_eq!(h.hooks.logins.load(Ordering::SeqCst), 1);
        assert_eq!(h.session.access_token().as_deref(), Some("acc-1"));
    }
}
