//! Remote service configuration.

use url::Url;

use crate::error::{Error, Result};
use crate::util::normalize_text_option;

/// Environment variable holding the note service base URL.
pub const API_URL_ENV: &str = "NOTESYNC_API_URL";

/// Validated location of the remote note service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    base_url: String,
}

impl GatewayConfig {
    /// Validate and normalize a base URL such as `https://notes.example.com`.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = normalize_text_option(Some(base_url.as_ref().to_string()))
            .ok_or_else(|| Error::Validation("API base URL must not be empty".to_string()))?;
        let parsed = Url::parse(&base_url).map_err(|error| {
            Error::Validation(format!("API base URL {base_url} is invalid: {error}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Validation(
                "API base URL must include http:// or https://".to_string(),
            ));
        }
        if parsed.host_str().unwrap_or_default().is_empty() {
            return Err(Error::Validation(format!(
                "API base URL {base_url} has no host"
            )));
        }
        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(Error::Validation(format!(
                "API base URL {base_url} must not carry a query or fragment"
            )));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Read the base URL from `NOTESYNC_API_URL`, if set.
    pub fn from_env() -> Result<Option<Self>> {
        normalize_text_option(std::env::var(API_URL_ENV).ok())
            .map(Self::new)
            .transpose()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path like `api/notes/`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_strips_trailing_slash() {
        let config = GatewayConfig::new(" https://notes.example.com/ ").unwrap();
        assert_eq!(config.base_url(), "https://notes.example.com");
        assert_eq!(
            config.endpoint("/api/notes/"),
            "https://notes.example.com/api/notes/"
        );
    }

    #[test]
    fn new_rejects_missing_scheme_and_empty() {
        assert!(GatewayConfig::new("notes.example.com").is_err());
        assert!(GatewayConfig::new("ftp://notes.example.com").is_err());
        assert!(GatewayConfig::new("   ").is_err());
    }

    #[test]
    fn new_rejects_malformed_hosts() {
        assert!(GatewayConfig::new("http://").is_err());
        assert!(GatewayConfig::new("https://exa mple.com").is_err());
        assert!(GatewayConfig::new("http://[::1").is_err());
        assert!(GatewayConfig::new("https://notes.example.com/?x=1").is_err());
    }

    #[test]
    fn new_keeps_path_prefix_and_port() {
        let config = GatewayConfig::new("http://localhost:8000/notes/").unwrap();
        assert_eq!(
            config.endpoint("api/notes/"),
            "http://localhost:8000/notes/api/notes/"
        );
    }
}
