//! Backend access for the Agora client core.
//!
//! - [`Endpoint`] describes one API entry; [`endpoints`] holds the ones the core uses
//! - [`Transport`] is the HTTP seam, [`ReqwestTransport`] the production implementation
//! - [`NetworkClient`] runs an endpoint through the throttle, connectivity,
//!   transient-retry and refresh pipeline and returns exactly one result
//! - [`Authenticator`] is implemented by the session layer

mod auth;
mod client;
mod endpoint;
pub mod endpoints;
mod error;
mod policy;
mod throttle;
mod transport;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use auth::Authenticator;
pub use client::{call_once, NetworkClient, CONNECTIVITY_TITLE, THROTTLED_TITLE};
pub use endpoint::{decode_body, Endpoint};
pub use error::{
    summarize_body, ApiError, ApiResult, ErrorKind, GENERIC_ERROR_TITLE, TRANSIENT_STATUSES,
};
pub use policy::{AttemptState, RetryDecision, RetryPolicy};
pub use throttle::{format_wait, parse_throttle_wait, throttle_message, THROTTLE_FALLBACK};
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport, TransportError};
