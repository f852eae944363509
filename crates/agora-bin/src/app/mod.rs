//! Application setup: shared state and service wiring.

mod init;
mod state;

pub use init::init;
pub use state::AppState;

use thiserror::Error;

/// Failures of a command after its banner, if any, was shown.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("a password is required (use --password or AGORA_PASSWORD)")]
    MissingPassword,

    #[error("not logged in")]
    NotLoggedIn,

    #[error("{0} failed")]
    Failed(&'static str),
}
