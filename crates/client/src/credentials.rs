//! Persisted API credentials.
//!
//! The admin API authenticates with a bearer token. The token is kept in the
//! platform credential store through the `keyring` crate:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (via D-Bus)
//!
//! From the file-manager client's point of view the token is read-only; only
//! the `login` / `logout` commands write it.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

/// The service name used for credential entries.
pub const SERVICE_NAME: &str = "moo-files";

/// The default entry name for the API token.
pub const DEFAULT_KEY_NAME: &str = "api_token";

/// Errors that can occur during credential store operations.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No token is stored under the requested entry.
    #[error("Token not found in credential store: {0}")]
    NotFound(String),

    /// Access to the credential store was denied.
    #[error("Credential store access denied: {0}")]
    AccessDenied(String),

    /// The credential store service is unavailable.
    #[error("Credential store unavailable: {0}")]
    ServiceUnavailable(String),

    /// The token could not be stored as given.
    #[error("Token encoding error: {0}")]
    EncodingError(String),

    /// A platform-specific credential store error occurred.
    #[error("Credential store error: {0}")]
    PlatformError(String),
}

/// Result type for credential operations.
pub type CredentialResult<T> = Result<T, CredentialError>;

/// Trait for credential store backends.
///
/// Implemented by the system keychain and by an in-memory store used for
/// tokens passed through the environment and in tests.
pub trait CredentialBackend: Send + Sync {
    /// Retrieve a secret.
    fn get_secret(&self, service: &str, key: &str) -> CredentialResult<String>;

    /// Store a secret.
    fn set_secret(&self, service: &str, key: &str, value: &str) -> CredentialResult<()>;

    /// Delete a secret.
    fn delete_secret(&self, service: &str, key: &str) -> CredentialResult<()>;
}

impl CredentialBackend for Box<dyn CredentialBackend> {
    fn get_secret(&self, service: &str, key: &str) -> CredentialResult<String> {
        (**self).get_secret(service, key)
    }

    fn set_secret(&self, service: &str, key: &str, value: &str) -> CredentialResult<()> {
        (**self).set_secret(service, key, value)
    }

    fn delete_secret(&self, service: &str, key: &str) -> CredentialResult<()> {
        (**self).delete_secret(service, key)
    }
}

/// Credential backend using the platform keychain.
pub struct SystemKeychain;

fn map_keyring_error(err: keyring::Error, key: &str) -> CredentialError {
    match err {
        keyring::Error::NoEntry => CredentialError::NotFound(key.to_string()),
        keyring::Error::Ambiguous(_) => {
            CredentialError::PlatformError("Ambiguous credential entry".to_string())
        }
        keyring::Error::TooLong(_, _) => CredentialError::EncodingError("Token too long".to_string()),
        keyring::Error::Invalid(_, _) => {
            CredentialError::EncodingError("Invalid token format".to_string())
        }
        keyring::Error::NoStorageAccess(_) => {
            CredentialError::AccessDenied("No storage access".to_string())
        }
        keyring::Error::PlatformFailure(_) => {
            CredentialError::ServiceUnavailable("Platform failure".to_string())
        }
        other => CredentialError::PlatformError(other.to_string()),
    }
}

impl CredentialBackend for SystemKeychain {
    fn get_secret(&self, service: &str, key: &str) -> CredentialResult<String> {
        let entry = keyring::Entry::new(service, key)
            .map_err(|e| CredentialError::PlatformError(e.to_string()))?;
        entry.get_password().map_err(|e| map_keyring_error(e, key))
    }

    fn set_secret(&self, service: &str, key: &str, value: &str) -> CredentialResult<()> {
        let entry = keyring::Entry::new(service, key)
            .map_err(|e| CredentialError::PlatformError(e.to_string()))?;
        entry.set_password(value).map_err(|e| map_keyring_error(e, key))
    }

    fn delete_secret(&self, service: &str, key: &str) -> CredentialResult<()> {
        let entry = keyring::Entry::new(service, key)
            .map_err(|e| CredentialError::PlatformError(e.to_string()))?;
        entry.delete_credential().map_err(|e| map_keyring_error(e, key))
    }
}

/// In-memory credential backend.
///
/// Holds tokens supplied through the environment and backs the tests.
#[derive(Default)]
pub struct MemoryCredentials {
    storage: Mutex<HashMap<String, String>>,
}

impl MemoryCredentials {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding a single secret.
    pub fn with_secret(service: &str, key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .storage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(Self::make_key(service, key), value.to_string());
        store
    }

    fn make_key(service: &str, key: &str) -> String {
        format!("{}:{}", service, key)
    }
}

impl CredentialBackend for MemoryCredentials {
    fn get_secret(&self, service: &str, key: &str) -> CredentialResult<String> {
        let storage = self
            .storage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        storage
            .get(&Self::make_key(service, key))
            .cloned()
            .ok_or_else(|| CredentialError::NotFound(key.to_string()))
    }

    fn set_secret(&self, service: &str, key: &str, value: &str) -> CredentialResult<()> {
        let mut storage = self
            .storage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        storage.insert(Self::make_key(service, key), value.to_string());
        Ok(())
    }

    fn delete_secret(&self, service: &str, key: &str) -> CredentialResult<()> {
        let mut storage = self
            .storage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if storage.remove(&Self::make_key(service, key)).is_some() {
            Ok(())
        } else {
            Err(CredentialError::NotFound(key.to_string()))
        }
    }
}

/// Token store over a credential backend.
pub struct TokenStore<B: CredentialBackend> {
    backend: B,
    service: String,
    key_name: String,
}

impl<B: CredentialBackend> TokenStore<B> {
    /// Create a token store with the default service and entry names.
    pub fn new(backend: B) -> Self {
        Self::with_names(backend, SERVICE_NAME, DEFAULT_KEY_NAME)
    }

    /// Create a token store with custom service and entry names.
    pub fn with_names(backend: B, service: impl Into<String>, key_name: impl Into<String>) -> Self {
        Self {
            backend,
            service: service.into(),
            key_name: key_name.into(),
        }
    }

    /// Get the stored token.
    pub fn get_token(&self) -> CredentialResult<String> {
        self.backend.get_secret(&self.service, &self.key_name)
    }

    /// Store a token, trimming surrounding whitespace.
    pub fn store_token(&self, token: &str) -> CredentialResult<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CredentialError::EncodingError("token is empty".to_string()));
        }
        self.backend.set_secret(&self.service, &self.key_name, token)
    }

    /// Delete the stored token.
    pub fn clear_token(&self) -> CredentialResult<()> {
        self.backend.delete_secret(&self.service, &self.key_name)
    }

    /// Check whether a token is stored.
    pub fn has_token(&self) -> bool {
        self.get_token().is_ok()
    }

    /// `Authorization` header value, or `None` when no token is stored.
    pub fn bearer_header(&self) -> CredentialResult<Option<String>> {
        match self.get_token() {
            Ok(token) => Ok(Some(format!("Bearer {}", token))),
            Err(CredentialError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl TokenStore<SystemKeychain> {
    /// Create a token store over the system keychain.
    pub fn system() -> Self {
        Self::new(SystemKeychain)
    }
}
