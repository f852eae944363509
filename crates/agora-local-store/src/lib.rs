//! On-device persistence for anonymous user data.
//!
//! This crate provides:
//! - Async SQLite executor with a dedicated thread
//! - Schema migrations
//! - Row types and query helpers for starred debates and progress
//! - [`LocalStore`], the lifecycle-aware facade the sync core talks to
//!
//! # Architecture
//!
//! Every statement runs on the executor thread owned by [`AsyncDatabase`].
//! [`LocalStore`] holds at most one open database; it must be loaded with
//! [`LocalStore::load_persistent_store`] before any read or write.
//!
//! ```ignore
//! let store = LocalStore::new(paths.database_file(), notifier);
//! store.load_persistent_store().await?;
//! store.set_starred(7, true).await?;
//! ```

mod error;
mod executor;
mod migrations;
mod models;
pub mod queries;
mod store;

pub use agora_config_and_utils::models::{DebateId, PointId, Progress};
pub use error::{DatabaseError, DatabaseResult};
pub use executor::AsyncDatabase;
pub use migrations::{run_migrations, CURRENT_VERSION};
pub use models::{ProgressRecord, StarredRecord};
pub use store::{LocalStore, DATA_CORRUPTED_TITLE};
