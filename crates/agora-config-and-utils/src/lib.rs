//! Core types, configuration, and utilities shared by the Agora client crates.

mod config;
mod error;
mod logging;
pub mod models;
pub mod notify;
mod paths;

pub use config::{Config, DEFAULT_API_URL, DEFAULT_LOG_LEVEL};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use models::{completion_percentage, DebateId, PointId, Progress};
pub use notify::{Banner, BannerAction, BannerStyle, Notifier};
pub use paths::Paths;

#[cfg(any(test, feature = "test-support"))]
pub use notify::{ActionResponse, RecordedBanner, RecordingNotifier};
