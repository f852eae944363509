//! Session layer for the Agora client core.
//!
//! This crate provides:
//! - The token pair and the observable `is_active` flag
//! - Login, logout and session resume on top of the token vault
//! - The refresh-and-retry hook consulted by the request pipeline
//! - Explicit FSM-based session state

mod auth_fsm;
mod error;
mod session;

pub use auth_fsm::session_machine;
pub use auth_fsm::{SessionMachine, SessionMachineInput, SessionMachineState, SessionState};
pub use error::{AuthError, AuthResult};
pub use session::{SessionHooks, SessionManager, SessionSnapshot, SESSION_EXPIRED_TITLE};
