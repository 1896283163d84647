//! Bearer token persistence for the note service.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Access/refresh token pair issued by `POST /api/auth/token/`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access: String,
    pub refresh: String,
}

impl fmt::Debug for AuthTokens {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthTokens")
            .field("access", &"[REDACTED]")
            .field("refresh", &"[REDACTED]")
            .finish()
    }
}

/// Where the gateway keeps its tokens between calls and runs.
pub trait TokenStore: Clone + Send + Sync + 'static {
    fn load_tokens(&self) -> Result<Option<AuthTokens>>;
    fn save_tokens(&self, tokens: &AuthTokens) -> Result<()>;
    fn clear_tokens(&self) -> Result<()>;
}

/// Process-local token store.
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    tokens: Arc<Mutex<Option<AuthTokens>>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn with_tokens(tokens: AuthTokens) -> Self {
        Self {
            tokens: Arc::new(Mutex::new(Some(tokens))),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load_tokens(&self) -> Result<Option<AuthTokens>> {
        let guard = self
            .tokens
            .lock()
            .map_err(|error| Error::Storage(error.to_string()))?;
        Ok(guard.clone())
    }

    fn save_tokens(&self, tokens: &AuthTokens) -> Result<()> {
        let mut guard = self
            .tokens
            .lock()
            .map_err(|error| Error::Storage(error.to_string()))?;
        *guard = Some(tokens.clone());
        Ok(())
    }

    fn clear_tokens(&self) -> Result<()> {
        let mut guard = self
            .tokens
            .lock()
            .map_err(|error| Error::Storage(error.to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// Account details submitted to `POST /api/auth/register/`
#[derive(Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub password_confirmation: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Registration")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .finish()
    }
}

impl Registration {
    pub fn validate(&self) -> Result<()> {
        validate_credentials(&self.username, &self.password)?;
        validate_new_password(&self.password, &self.password_confirmation)?;
        if !self.email.contains('@') {
            return Err(Error::Validation("Email address is invalid".to_string()));
        }
        Ok(())
    }
}

pub fn validate_credentials(username: &str, password: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(Error::Validation("Username is required".to_string()));
    }
    if password.is_empty() {
        return Err(Error::Validation("Password is required".to_string()));
    }
    Ok(())
}

pub fn validate_new_password(password: &str, confirmation: &str) -> Result<()> {
    if password.is_empty() {
        return Err(Error::Validation("Password is required".to_string()));
    }
    if password != confirmation {
        return Err(Error::Validation("Passwords do not match".to_string()));
    }
    Ok(())
}
