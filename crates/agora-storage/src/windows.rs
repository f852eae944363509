//! Windows Credential Vault backend.

use crate::{SecureStorage, StorageError, StorageResult};
use tracing::debug;
use windows::{
    core::HSTRING,
    Security::Credentials::{PasswordCredential, PasswordVault},
};

// HRESULT_FROM_WIN32(ERROR_NOT_FOUND)
const ERROR_NOT_FOUND: u32 = 0x8007_0490;

/// One password credential per key under a shared resource name.
pub struct CredentialStorage {
    resource_name: String,
}

impl CredentialStorage {
    pub fn new(service_name: &str) -> StorageResult<Self> {
        PasswordVault::new().map_err(|e| {
            StorageError::Platform(format!("Failed to access Credential Vault: {}", e))
        })?;

        Ok(Self {
            resource_name: service_name.to_string(),
        })
    }

    fn vault(&self) -> StorageResult<PasswordVault> {
        PasswordVault::new().map_err(|e| {
            StorageError::Platform(format!("Failed to access Credential Vault: {}", e))
        })
    }

    /// Look up a credential, mapping "not found" to `None`.
    fn find(&self, vault: &PasswordVault, key: &str) -> StorageResult<Option<PasswordCredential>> {
        let resource = HSTRING::from(&self.resource_name);
        let user_name = HSTRING::from(key);

        match vault.Retrieve(&resource, &user_name) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) if e.code().0 as u32 == ERROR_NOT_FOUND => Ok(None),
            Err(e) => Err(StorageError::Platform(format!(
                "Failed to retrieve credential: {}",
                e
            ))),
        }
    }
}

impl SecureStorage for CredentialStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(resource = %self.resource_name, key = %key, "Setting credential");
        let vault = self.vault()?;
        self.delete(key)?;

        let credential = PasswordCredential::CreatePasswordCredential(
            &HSTRING::from(&self.resource_name),
            &HSTRING::from(key),
            &HSTRING::from(value),
        )
        .map_err(|e| StorageError::Platform(format!("Failed to create credential: {}", e)))?;

        vault
            .Add(&credential)
            .map_err(|e| StorageError::Platform(format!("Failed to add credential: {}", e)))
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let vault = self.vault()?;
        let Some(credential) = self.find(&vault, key)? else {
            return Ok(None);
        };

        // Password stays empty until it is explicitly retrieved
        credential
            .RetrievePassword()
            .map_err(|e| StorageError::Platform(format!("Failed to retrieve password: {}", e)))?;
        let password = credential
            .Password()
            .map_err(|e| StorageError::Platform(format!("Failed to get password: {}", e)))?;

        Ok(Some(password.to_string()))
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        debug!(resource = %self.resource_name, key = %key, "Deleting credential");
        let vault = self.vault()?;
        let Some(credential) = self.find(&vault, key)? else {
            return Ok(false);
        };

        vault
            .Remove(&credential)
            .map_err(|e| StorageError::Platform(format!("Failed to remove credential: {}", e)))?;
        Ok(true)
    }
}
