//! Application state definition.

use agora_auth::SessionManager;
use agora_config_and_utils::notify::Notifier;
use agora_config_and_utils::Paths;
use agora_user_data::{LoadState, UserDataManager};
use std::sync::Arc;

/// Services shared by every command.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<Paths>,
    pub session: Arc<SessionManager>,
    pub user_data: Arc<UserDataManager>,
    pub notifier: Arc<dyn Notifier>,
    /// Outcome of the load performed at startup.
    pub initial_load: LoadState,
}
