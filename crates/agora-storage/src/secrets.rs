//! High-level API for the session's token pair.

use crate::{SecureStorage, StorageKeys, StorageResult};

/// Access and refresh token as issued by the token endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Token storage on top of a [`SecureStorage`] backend.
pub struct TokenVault {
    storage: Box<dyn SecureStorage>,
}

impl TokenVault {
    pub fn new(storage: Box<dyn SecureStorage>) -> Self {
        Self { storage }
    }

    pub fn access_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::REFRESH_TOKEN)
    }

    pub fn set_access_token(&self, token: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::ACCESS_TOKEN, token)
    }

    pub fn set_refresh_token(&self, token: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::REFRESH_TOKEN, token)
    }

    /// Persist a freshly issued pair. The refresh token goes first so a crash
    /// in between never leaves an access token without its refresh token.
    pub fn store_pair(&self, pair: &TokenPair) -> StorageResult<()> {
        self.set_refresh_token(&pair.refresh)?;
        self.set_access_token(&pair.access)
    }

    /// Both tokens, or `None` unless both are present.
    pub fn load_pair(&self) -> StorageResult<Option<TokenPair>> {
        let refresh = match self.refresh_token()? {
            Some(token) => token,
            None => return Ok(None),
        };
        let access = match self.access_token()? {
            Some(token) => token,
            None => return Ok(None),
        };
        Ok(Some(TokenPair { access, refresh }))
    }

    /// Remove both tokens, refresh first.
    ///
    /// Both deletes are attempted even if the first fails; the first error is returned.
    pub fn clear_tokens(&self) -> StorageResult<()> {
        let refresh = self.storage.delete(StorageKeys::REFRESH_TOKEN);
        let access = self.storage.delete(StorageKeys::ACCESS_TOKEN);
        refresh?;
        access?;
        Ok(())
    }
}
