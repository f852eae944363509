//! Service construction.

use super::AppState;
use crate::console::ConsoleNotifier;
use agora_api::{NetworkClient, ReqwestTransport, Transport};
use agora_auth::SessionManager;
use agora_config_and_utils::notify::Notifier;
use agora_config_and_utils::{Config, Paths};
use agora_local_store::LocalStore;
use agora_storage::create_token_vault;
use agora_user_data::UserDataManager;
use std::sync::Arc;
use tracing::{debug, info};

/// Wire the services, resume the stored session and load user data.
pub async fn init(config: Config, paths: Paths) -> Result<AppState, Box<dyn std::error::Error>> {
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(config.request_timeout())?);

    let session = Arc::new(SessionManager::new(
        &config,
        create_token_vault(&paths),
        transport.clone(),
        notifier.clone(),
    )?);
    let client = Arc::new(NetworkClient::new(
        &config,
        transport,
        session.clone(),
        notifier.clone(),
    )?);
    debug!(client = ?client, "Network client ready");

    let store = Arc::new(LocalStore::new(paths.database_file(), notifier.clone()));
    let user_data = UserDataManager::new(session.clone(), client, store, notifier.clone());

    let resumed = session.resume_session().await?;
    let initial_load = user_data.load_user_data().await;
    info!(resumed, load_state = ?initial_load, "Startup complete");

    Ok(AppState {
        paths: Arc::new(paths),
        session,
        user_data,
        notifier,
        initial_load,
    })
}
