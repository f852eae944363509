//! `agora logout`.

use crate::app::{AppState, CommandError};
use agora_auth::AuthError;
use agora_config_and_utils::notify::Banner;

pub async fn logout(state: &AppState) -> Result<(), Box<dyn std::error::Error>> {
    match state.session.logout().await {
        Ok(()) => {
            state.notifier.show(Banner::info("Logged out"));
            Ok(())
        }
        Err(AuthError::NotLoggedIn) => Err(CommandError::NotLoggedIn.into()),
        Err(error) => Err(error.into()),
    }
}
