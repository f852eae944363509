//! Secure token storage for the Agora client core.
//!
//! Backends:
//! - **macOS**: Keychain via `security-framework`
//! - **Linux**: Secret Service (GNOME Keyring / KWallet) via `secret-service`
//! - **Windows**: Credential Vault via `windows`
//! - **File**: JSON map under the client's base directory, mode 0600. Used
//!   when no platform store is reachable (headless Linux, other targets).
//! - **Memory**: process-local, used by tests

mod file;
mod keys;
mod memory;
mod secrets;
mod traits;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "windows")]
mod windows;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use secrets::{TokenPair, TokenVault};
pub use traits::SecureStorage;

use agora_config_and_utils::Paths;
use thiserror::Error;
use tracing::warn;

/// Service name every platform backend files its items under.
pub const SERVICE_NAME: &str = "app.agora.client";

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific failure
    #[error("Platform storage error: {0}")]
    Platform(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create the platform keychain backend.
pub fn create_platform_storage() -> StorageResult<Box<dyn SecureStorage>> {
    #[cfg(target_os = "macos")]
    {
        let storage = macos::KeychainStorage::new(SERVICE_NAME)?;
        Ok(Box::new(storage))
    }

    #[cfg(target_os = "linux")]
    {
        let storage = linux::SecretServiceStorage::new(SERVICE_NAME)?;
        Ok(Box::new(storage))
    }

    #[cfg(target_os = "windows")]
    {
        let storage = windows::CredentialStorage::new(SERVICE_NAME)?;
        Ok(Box::new(storage))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        Err(StorageError::Platform(
            "No secure storage implementation available for this platform".to_string(),
        ))
    }
}

/// Create the default durable storage: the platform keychain, or the
/// private credentials file when the keychain is unavailable.
pub fn create_storage(paths: &Paths) -> Box<dyn SecureStorage> {
    storage_or_file(create_platform_storage(), paths)
}

fn storage_or_file(
    platform: StorageResult<Box<dyn SecureStorage>>,
    paths: &Paths,
) -> Box<dyn SecureStorage> {
    match platform {
        Ok(storage) => storage,
        Err(e) => {
            warn!(error = %e, "Platform keychain unavailable, using credentials file");
            Box::new(FileStorage::new(paths.credentials_file()))
        }
    }
}

/// Create a TokenVault over the default durable storage.
pub fn create_token_vault(paths: &Paths) -> TokenVault {
    TokenVault::new(create_storage(paths))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();

        storage.set("test_key", "test_value").unwrap();
        assert_eq!(storage.get("test_key").unwrap(), Some("test_value".to_string()));

        assert!(storage.has("test_key").unwrap());
        assert!(!storage.has("nonexistent").unwrap());

        assert!(storage.delete("test_key").unwrap());
        assert!(!storage.delete("test_key").unwrap());
        assert_eq!(storage.get("test_key").unwrap(), None);
    }

    #[test]
    fn test_token_vault_pair() {
        let vault = TokenVault::new(Box::new(MemoryStorage::new()));
        assert!(vault.load_pair().unwrap().is_none());

        vault
            .store_pair(&TokenPair {
                access: "a1".into(),
                refresh: "r1".into(),
            })
            .unwrap();

        let pair = vault.load_pair().unwrap().unwrap();
        assert_eq!(pair.access, "a1");
        assert_eq!(pair.refresh, "r1");

        vault.set_access_token("a2").unwrap();
        assert_eq!(vault.access_token().unwrap().as_deref(), Some("a2"));
        assert_eq!(vault.refresh_token().unwrap().as_deref(), Some("r1"));
    }

    #[test]
    fn test_token_vault_half_pair_is_none() {
        let vault = TokenVault::new(Box::new(MemoryStorage::new()));
        vault.set_access_token("only-access").unwrap();
        assert!(vault.load_pair().unwrap().is_none());

        vault.clear_tokens().unwrap();
        vault.set_refresh_token("only-refresh").unwrap();
        assert!(vault.load_pair().unwrap().is_none());
    }

    #[test]
    fn test_token_vault_clear() {
        let vault = TokenVault::new(Box::new(MemoryStorage::new()));
        vault.set_refresh_token("r").unwrap();
        vault.set_access_token("a").unwrap();

        vault.clear_tokens().unwrap();
        assert!(vault.access_token().unwrap().is_none());
        assert!(vault.refresh_token().unwrap().is_none());

        // Clearing again is harmless.
        vault.clear_tokens().unwrap();
    }

    #[test]
    fn test_token_pair_debug_is_redacted() {
        let pair = TokenPair {
            access: "secret-access".into(),
            refresh: "secret-refresh".into(),
        };
        let rendered = format!("{:?}", pair);
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn test_unavailable_keychain_falls_back_to_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let storage = storage_or_file(Err(StorageError::Platform("no bus".into())), &paths);
        storage.set(StorageKeys::REFRESH_TOKEN, "r1").unwrap();

        assert!(paths.credentials_file().exists());
        let reopened = FileStorage::new(paths.credentials_file());
        assert_eq!(
            reopened.get(StorageKeys::REFRESH_TOKEN).unwrap().as_deref(),
            Some("r1")
        );
    }

    #[test]
    fn test_available_keychain_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let storage = storage_or_file(Ok(Box::new(MemoryStorage::new())), &paths);
        storage.set(StorageKeys::ACCESS_TOKEN, "a1").unwrap();

        assert!(!paths.credentials_file().exists());
    }

    #[test]
    fn test_storage_keys_unique() {
        assert_ne!(StorageKeys::ACCESS_TOKEN, StorageKeys::REFRESH_TOKEN);
    }
}
