//! # User data: starred debates and reading progress
//!
//! [`UserDataManager`] is the single source of truth for what the user has
//! starred and which points they have seen. It hides whether a write goes
//! to the backend (authenticated) or to the on-device store (anonymous),
//! and after login it pushes local-only data to the backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌─────────────────┐     ┌──────────────┐
//! │    Caller    │────▶│ UserDataManager │────▶│ NetworkClient│  (active session)
//! └──────────────┘     │  watch caches   │     └──────────────┘
//!                      └────────┬────────┘
//!                               │ anonymous
//!                        ┌──────▼──────┐
//!                        │ LocalStore  │
//!                        │  (SQLite)   │
//!                        └─────────────┘
//! ```
//!
//! ## Key Features
//!
//! - **Idempotent writes**: starring a starred debate or marking a seen point
//!   returns immediately without I/O.
//!
//! - **Ordered load**: starred loads before progress, and the loaded flag is
//!   set only when both succeeded.
//!
//! - **Per-step retry**: each load or push step that fails shows one banner
//!   whose retry action re-runs just that step.
//!
//! - **Session hooks**: login triggers the backend sync, logout clears the
//!   caches and re-arms the local store.

mod error;
mod manager;

pub use error::{UserDataError, UserDataResult};
pub use manager::{LoadState, UserDataManager};
