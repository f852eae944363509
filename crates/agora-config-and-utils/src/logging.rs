//! Logging initialization.
//!
//! Thin wrapper over the observability crate so binaries configure tracing
//! in one call. Events go to `~/.agora/logs/dev.jsonl` and stderr.

use crate::Paths;
use observability::LogConfig;

/// Initialize the logging system.
///
/// `level` is the default filter; `RUST_LOG` still wins when set. Logs land
/// in `paths.log_file()` when `paths` is given, otherwise the
/// observability default location.
///
/// ```ignore
/// init_logging("info", Some(&paths));
/// tracing::info!("client started");
/// ```
pub fn init_logging(level: &str, paths: Option<&Paths>) {
    observability::init_with_config(LogConfig {
        service_name: "agora".into(),
        default_level: parse_level(level).to_string().to_lowercase(),
        log_path: paths.map(Paths::log_file),
        also_stderr: std::env::var("AGORA_LOG_STDERR")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false),
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
