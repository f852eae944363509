use crate::app::{AppState, CommandError};
use agora_user_data::LoadState;

/// Push local data and reload. Failed steps have shown their own banners.
pub async fn sync(state: &AppState) -> Result<(), CommandError> {
    if !state.session.is_active() {
        return Err(CommandError::NotLoggedIn);
    }
    state.user_data.sync_user_data_to_backend().await;
    match state.user_data.load_state() {
        LoadState::Loaded => {
            println!("Synced");
            Ok(())
        }
        _ => Err(CommandError::Failed("sync")),
    }
}
