//! `agora login`.

use crate::app::{AppState, CommandError};
use agora_config_and_utils::notify::Banner;
use tracing::warn;

/// Log in; the session's hooks push local data and reload.
pub async fn login(state: &AppState, email: &str, password: &str) -> Result<(), CommandError> {
    match state.session.login(email, password).await {
        Ok(()) => {
            state
                .notifier
                .show(Banner::success("Logged in").with_subtitle(email.to_string()));
            Ok(())
        }
        Err(error) => {
            warn!(error = %error, "Login failed");
            error.report(state.notifier.as_ref());
            Err(CommandError::Failed("login"))
        }
    }
}
