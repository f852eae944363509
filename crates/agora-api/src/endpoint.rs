//! Endpoint descriptions.

use crate::{ApiError, ApiResult, Method};
use serde::de::DeserializeOwned;

/// One backend API entry: where it lives, how it is called, and what
/// counts as success.
pub trait Endpoint: Send + Sync {
    /// Decoded success body. Use [`serde::de::IgnoredAny`] when the body is irrelevant.
    type Response: DeserializeOwned + Send;

    /// Path relative to the configured base URL, with a trailing slash.
    fn path(&self) -> String;

    fn method(&self) -> Method;

    /// Whether the session's bearer token is attached.
    fn requires_auth(&self) -> bool {
        true
    }

    fn body(&self) -> Option<serde_json::Value> {
        None
    }

    /// Accepted HTTP statuses. Not uniformly 2xx: creations answer 201, reads 200.
    fn success_codes(&self) -> &'static [u16];
}

/// Decode a success body. An empty body decodes as JSON `null`.
pub fn decode_body<T: DeserializeOwned>(body: &str) -> ApiResult<T> {
    let text = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(text).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::IgnoredAny;

    #[test]
    fn empty_body_decodes_as_null() {
        assert!(decode_body::<IgnoredAny>("").is_ok());
        assert!(decode_body::<IgnoredAny>("  ").is_ok());
        assert_eq!(decode_body::<Option<u8>>("").unwrap(), None);
    }

    #[test]
    fn mismatched_body_is_decode_error() {
        let err = decode_body::<Vec<i64>>(r#"{"starred_list": []}"#).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
