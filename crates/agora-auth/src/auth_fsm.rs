//! Session state machine using rust-fsm.
//!
//! The machine tracks the in-progress states that never reach storage
//! (logging in, refreshing, logging out). Whether a session exists at all
//! is decided by the token pair held by the session manager.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐  SessionResumed
//! │    Anonymous    │ ─────────────────────────┐
//! └────────┬────────┘                          │
//!          │ LoginAttempt                      │
//!          ▼                                   │
//! ┌─────────────────┐                          │
//! │    LoggingIn    │ ── LoginFailed ──► Anonymous
//! └────────┬────────┘                          │
//!          │ LoginSuccess                      │
//!          ▼                                   │
//! ┌─────────────────┐ ◄────────────────────────┘
//! │  Authenticated  │ ◄──── RefreshSuccess ────┐
//! └───┬─────────┬───┘                          │
//!     │         │ TokenRejected       ┌─────────────────┐
//!     │         └───────────────────► │   Refreshing    │
//!     │ LogoutRequested               └────────┬────────┘
//!     ▼                                        │ RefreshFailed
//! ┌─────────────────┐ ◄────────────────────────┘
//! │   LoggingOut    │ ── LogoutComplete ──► Anonymous
//! └─────────────────┘
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Anonymous)

    Anonymous => {
        LoginAttempt => LoggingIn,
        SessionResumed => Authenticated
    },
    LoggingIn => {
        LoginSuccess => Authenticated,
        LoginFailed => Anonymous
    },
    Authenticated => {
        TokenRejected => Refreshing,
        LogoutRequested => LoggingOut
    },
    Refreshing => {
        RefreshSuccess => Authenticated,
        // A failed refresh always ends the session
        RefreshFailed => LoggingOut
    },
    LoggingOut => {
        LogoutComplete => Anonymous
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Session state for display and status output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Anonymous,
    LoggingIn,
    Authenticated,
    Refreshing,
    LoggingOut,
}

impl SessionState {
    /// True while a token pair is held and usable.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated | SessionState::Refreshing)
    }

    /// Returns true if the state is an in-progress state.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionState::LoggingIn | SessionState::Refreshing | SessionState::LoggingOut
        )
    }
}

impl From<&SessionMachineState> for SessionState {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Anonymous => SessionState::Anonymous,
            SessionMachineState::LoggingIn => SessionState::LoggingIn,
            SessionMachineState::Authenticated => SessionState::Authenticated,
            SessionMachineState::Refreshing => SessionState::Refreshing,
            SessionMachineState::LoggingOut => SessionState::LoggingOut,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Anonymous => "anonymous",
            SessionState::LoggingIn => "logging_in",
            SessionState::Authenticated => "authenticated",
            SessionState::Refreshing => "refreshing",
            SessionState::LoggingOut => "logging_out",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let machine = SessionMachine::new();
        assert_eq!(*machine.state(), SessionMachineState::Anonymous);
    }

    #[test]
    fn test_login_flow() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionMachineInput::LoginAttempt).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::LoggingIn);

        machine.consume(&SessionMachineInput::LoginSuccess).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_login_failure_returns_to_anonymous() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionMachineInput::LoginAttempt).unwrap();
        machine.consume(&SessionMachineInput::LoginFailed).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Anonymous);
    }

    #[test]
    fn test_resume_skips_login() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionMachineInput::SessionResumed).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_refresh_success_flow() {
        let mut machine = SessionMachine::new();
        machine.consume(&SessionMachineInput::SessionResumed).unwrap();

        machine.consume(&SessionMachineInput::TokenRejected).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Refreshing);

        machine.consume(&SessionMachineInput::RefreshSuccess).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_refresh_failure_logs_out() {
        let mut machine = SessionMachine::new();
        machine.consume(&SessionMachineInput::SessionResumed).unwrap();
        machine.consume(&SessionMachineInput::TokenRejected).unwrap();

        machine.consume(&SessionMachineInput::RefreshFailed).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::LoggingOut);

        machine.consume(&SessionMachineInput::LogoutComplete).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Anonymous);
    }

    #[test]
    fn test_logout_flow() {
        let mut machine = SessionMachine::new();
        machine.consume(&SessionMachineInput::LoginAttempt).unwrap();
        machine.consume(&SessionMachineInput::LoginSuccess).unwrap();

        machine.consume(&SessionMachineInput::LogoutRequested).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::LoggingOut);

        machine.consume(&SessionMachineInput::LogoutComplete).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Anonymous);
    }

    #[test]
    fn test_invalid_transition_returns_error() {
        let mut machine = SessionMachine::new();

        // Nothing to log out of
        assert!(machine.consume(&SessionMachineInput::LogoutRequested).is_err());
        // No request can be rejected without a session
        assert!(machine.consume(&SessionMachineInput::TokenRejected).is_err());
        assert!(machine.consume(&SessionMachineInput::LoginSuccess).is_err());
    }

    #[test]
    fn test_second_refresh_needs_authenticated_state() {
        let mut machine = SessionMachine::new();
        machine.consume(&SessionMachineInput::SessionResumed).unwrap();
        machine.consume(&SessionMachineInput::TokenRejected).unwrap();

        assert!(machine.consume(&SessionMachineInput::TokenRejected).is_err());
    }

    #[test]
    fn test_session_state_conversion() {
        assert_eq!(
            SessionState::from(&SessionMachineState::Anonymous),
            SessionState::Anonymous
        );
        assert_eq!(
            SessionState::from(&SessionMachineState::Refreshing),
            SessionState::Refreshing
        );
        assert_eq!(
            SessionState::from(&SessionMachineState::LoggingOut),
            SessionState::LoggingOut
        );
    }

    #[test]
    fn test_session_state_is_authenticated() {
        assert!(!SessionState::Anonymous.is_authenticated());
        assert!(!SessionState::LoggingIn.is_authenticated());
        assert!(SessionState::Authenticated.is_authenticated());
        assert!(SessionState::Refreshing.is_authenticated());
        assert!(!SessionState::LoggingOut.is_authenticated());
    }

    #[test]
    fn test_session_state_is_transient() {
        assert!(!SessionState::Anonymous.is_transient());
        assert!(SessionState::LoggingIn.is_transient());
        assert!(!SessionState::Authenticated.is_transient());
        assert!(SessionState::Refreshing.is_transient());
        assert!(SessionState::LoggingOut.is_transient());
    }

    #[test]
    fn test_session_state_serializes_snake_case() {
        let json = serde_json::to_string(&SessionState::LoggingOut).unwrap();
        assert_eq!(json, "\"logging_out\"");
        assert_eq!(SessionState::Authenticated.to_string(), "authenticated");
    }
}
