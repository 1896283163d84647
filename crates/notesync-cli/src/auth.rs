//! Token persistence in the OS keychain, one entry per CLI profile.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;
use notesync_core::auth::{AuthTokens, TokenStore};
use notesync_core::{Error, Result};

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "notesync-cli";

#[derive(Debug, Clone)]
pub struct KeyringTokenStore {
    username: String,
}

impl KeyringTokenStore {
    pub fn for_profile(profile_name: &str) -> Self {
        Self {
            username: format!("api_tokens:{profile_name}"),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> Result<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| Error::Storage(error.to_string()))
    }
}

impl TokenStore for KeyringTokenStore {
    #[cfg(not(test))]
    fn load_tokens(&self) -> Result<Option<AuthTokens>> {
        let entry = self.entry()?;
        match entry.get_password() {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(Error::Storage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn load_tokens(&self) -> Result<Option<AuthTokens>> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| Error::Storage(error.to_string()))?;
        guard
            .get(&self.username)
            .map(|raw| serde_json::from_str(raw).map_err(Error::from))
            .transpose()
    }

    #[cfg(not(test))]
    fn save_tokens(&self, tokens: &AuthTokens) -> Result<()> {
        let raw = serde_json::to_string(tokens)?;
        self.entry()?
            .set_password(&raw)
            .map_err(|error| Error::Storage(error.to_string()))
    }

    #[cfg(test)]
    fn save_tokens(&self, tokens: &AuthTokens) -> Result<()> {
        let raw = serde_json::to_string(tokens)?;
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| Error::Storage(error.to_string()))?;
        guard.insert(self.username.clone(), raw);
        Ok(())
    }

    #[cfg(not(test))]
    fn clear_tokens(&self) -> Result<()> {
        let entry = self.entry()?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(Error::Storage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn clear_tokens(&self) -> Result<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| Error::Storage(error.to_string()))?;
        guard.remove(&self.username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> AuthTokens {
        AuthTokens {
            access: "secret-access-token".to_string(),
            refresh: "secret-refresh-token".to_string(),
        }
    }

    #[test]
    fn profiles_keep_separate_tokens() {
        let work = KeyringTokenStore::for_profile("auth-test-work");
        let home = KeyringTokenStore::for_profile("auth-test-home");

        work.save_tokens(&tokens()).unwrap();

        assert_eq!(work.load_tokens().unwrap(), Some(tokens()));
        assert_eq!(home.load_tokens().unwrap(), None);

        work.clear_tokens().unwrap();
        assert_eq!(work.load_tokens().unwrap(), None);
    }

    #[test]
    fn clearing_missing_tokens_is_ok() {
        let store = KeyringTokenStore::for_profile("auth-test-missing");
        assert!(store.clear_tokens().is_ok());
    }

    #[test]
    fn token_debug_redacts_secrets() {
        let rendered = format!("{:?}", tokens());
        assert!(!rendered.contains("secret-access-token"));
        assert!(!rendered.contains("secret-refresh-token"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
