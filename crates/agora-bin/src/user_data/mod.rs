//! Starred and progress commands.

mod progress;
mod starred;
mod sync;

pub use progress::{mark_seen, show_progress};
pub use starred::{list_starred, set_star};
pub use sync::sync;

use crate::app::{AppState, CommandError};
use agora_user_data::UserDataError;

/// Report `error` once and turn it into a command failure.
fn fail(state: &AppState, command: &'static str, error: UserDataError) -> CommandError {
    tracing::warn!(command, error = %error, "Command failed");
    error.report(state.notifier.as_ref());
    CommandError::Failed(command)
}
