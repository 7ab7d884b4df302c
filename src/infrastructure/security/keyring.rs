use crate::domain::error::{AppError, Result};
use keyring::Entry;

/// Looks up provider API keys in the OS credential store.
pub struct KeyringManager {
    service: String,
}

impl KeyringManager {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, account: &str) -> Result<Entry> {
        Entry::new(&self.service, account)
            .map_err(|e| AppError::SecurityError(format!("Failed to create entry: {}", e)))
    }

    /// `Ok(None)` when the store has no entry for `account`.
    pub fn find_secret(&self, account: &str) -> Result<Option<String>> {
        match self.entry(account)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AppError::SecurityError(format!(
                "Failed to get password: {}",
                e
            ))),
        }
    }
}
