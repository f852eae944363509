//! Rate-limit (HTTP 429) body parsing.

use regex::Regex;
use std::sync::OnceLock;

/// Subtitle used when the wait time cannot be read from the response.
pub const THROTTLE_FALLBACK: &str = "Please try again later";

fn wait_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"available in (\d+) seconds?").ok())
        .as_ref()
}

/// Seconds to wait, read from the `detail` field of a throttled response
/// (`{"detail": "Request was throttled. Expected available in 42 seconds."}`).
pub fn parse_throttle_wait(body: &str) -> Option<u64> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let detail = value.get("detail")?.as_str()?;
    let captures = wait_pattern()?.captures(detail)?;
    captures.get(1)?.as_str().parse().ok()
}

fn unit(count: u64, singular: &str) -> String {
    if count == 1 {
        format!("1 {}", singular)
    } else {
        format!("{} {}s", count, singular)
    }
}

/// Human-readable duration: `42 seconds`, `1 minute 5 seconds`, `2 hours 1 minute`.
pub fn format_wait(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(unit(hours, "hour"));
    }
    if minutes > 0 {
        parts.push(unit(minutes, "minute"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(unit(seconds, "second"));
    }
    parts.join(" ")
}

/// Banner subtitle for a throttled response body.
pub fn throttle_message(body: &str) -> String {
    match parse_throttle_wait(body) {
        Some(seconds) => format!("Try again in {}", format_wait(seconds)),
        None => THROTTLE_FALLBACK.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detail_field() {
        assert_eq!(parse_throttle_wait(r#"{"detail": "available in 42 seconds"}"#), Some(42));
        assert_eq!(
            parse_throttle_wait(r#"{"detail": "Request was throttled. Expected available in 1 second."}"#),
            Some(1)
        );
    }

    #[test]
    fn rejects_unusable_bodies() {
        assert_eq!(parse_throttle_wait(""), None);
        assert_eq!(parse_throttle_wait("available in 42 seconds"), None);
        assert_eq!(parse_throttle_wait(r#"{"detail": "slow down"}"#), None);
        assert_eq!(parse_throttle_wait(r#"{"message": "available in 42 seconds"}"#), None);
        assert_eq!(parse_throttle_wait(r#"{"detail": 42}"#), None);
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_wait(0), "0 seconds");
        assert_eq!(format_wait(1), "1 second");
        assert_eq!(format_wait(42), "42 seconds");
        assert_eq!(format_wait(60), "1 minute");
        assert_eq!(format_wait(65), "1 minute 5 seconds");
        assert_eq!(format_wait(3660), "1 hour 1 minute");
        assert_eq!(format_wait(7322), "2 hours 2 minutes 2 seconds");
    }

    #[test]
    fn builds_banner_message() {
        assert_eq!(
            throttle_message(r#"{"detail": "available in 42 seconds"}"#),
            "Try again in 42 seconds"
        );
        assert_eq!(throttle_message("<html>"), THROTTLE_FALLBACK);
    }
}
