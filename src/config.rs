//! Credential resolution for the generation service.

use crate::error::{Result, SundaError};
use std::fmt;

/// Environment variables checked for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 3] = ["GEMINI_API_KEY", "API_KEY", "GOOGLE_API_KEY"];

/// Secret credential for the generation service.
///
/// `Debug` and `Display` never print the key itself.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps an explicit key. Surrounding whitespace is trimmed.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(SundaError::Auth("API key is empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Resolves the key from the first non-empty variable in [`API_KEY_ENV_VARS`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find_map(|value| Self::new(value).ok())
            .ok_or_else(|| {
                SundaError::Auth(format!(
                    "no API key provided; set one of {}",
                    API_KEY_ENV_VARS.join(", ")
                ))
            })
    }

    /// Returns the raw key for use in request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([redacted])")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[redacted]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_key_is_redacted() {
        let key = ApiKey::new("super-secret").unwrap();
        assert_eq!(format!("{key:?}"), "ApiKey([redacted])");
        assert_eq!(key.to_string(), "[redacted]");
        assert_eq!(key.expose(), "super-secret");
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(ApiKey::new("   "), Err(SundaError::Auth(_))));
    }

    #[test]
    fn test_env_precedence() {
        let key = ApiKey::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "google"),
            ("API_KEY", "plain"),
        ]))
        .unwrap();
        assert_eq!(key.expose(), "plain");
    }

    #[test]
    fn test_empty_env_value_skipped() {
        let key = ApiKey::from_lookup(lookup(&[
            ("GEMINI_API_KEY", ""),
            ("GOOGLE_API_KEY", "google"),
        ]))
        .unwrap();
        assert_eq!(key.expose(), "google");
    }

    #[test]
    fn test_missing_key() {
        let err = ApiKey::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }
}
