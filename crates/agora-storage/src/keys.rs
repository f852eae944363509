//! Storage key constants.

/// Keys the client core stores in the secure backend.
pub struct StorageKeys;

impl StorageKeys {
    /// Short-lived bearer token attached to authenticated requests.
    pub const ACCESS_TOKEN: &'static str = "access_token";

    /// Long-lived token exchanged for a new access token.
    pub const REFRESH_TOKEN: &'static str = "refresh_token";
}
