use std::env;
use std::fmt;

use crate::config::PublishConfig;
use crate::error::{ReleaseError, Result};

pub const CLIENT_SECRET_ENV: &str = "CHROME_WEBSTORE_OAUTH_SECRET";
pub const REFRESH_TOKEN_ENV: &str = "CHROME_WEBSTORE_OAUTH_REFRESH_TOKEN";
pub const CLIENT_ID_ENV: &str = "CHROME_WEBSTORE_CLIENT_ID";
pub const EXTENSION_ID_ENV: &str = "CHROME_WEBSTORE_EXTENSION_ID";

/// A credential value that never prints itself.
///
/// `Debug` and `Display` both render `****`; use [Secret::expose] at the one
/// place the raw value is sent over the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

/// Everything the store needs to authenticate a publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCredentials {
    pub client_id: String,
    pub client_secret: Secret,
    pub refresh_token: Secret,
    pub extension_id: String,
}

impl StoreCredentials {
    /// Read credentials from the environment, with ids falling back to config.
    ///
    /// The client secret and refresh token only ever come from the environment.
    pub fn from_env(config: &PublishConfig) -> Result<Self> {
        Self::from_lookup(config, |name| env::var(name).ok())
    }

    /// Same as [StoreCredentials::from_env] with an injectable variable lookup
    pub fn from_lookup<F>(config: &PublishConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| {
                    ReleaseError::missing_credential(format!(
                        "env var {} required for publishing and not set",
                        name
                    ))
                })
        };
        let id = |configured: &Option<String>, env_name: &str| {
            configured
                .clone()
                .filter(|value| !value.trim().is_empty())
                .or_else(|| lookup(env_name).filter(|value| !value.trim().is_empty()))
                .ok_or_else(|| {
                    ReleaseError::missing_credential(format!(
                        "{} must be set in [publish] config or env var {}",
                        env_name.to_lowercase(),
                        env_name
                    ))
                })
        };

        let credentials = StoreCredentials {
            client_secret: Secret::new(required(CLIENT_SECRET_ENV)?),
            refresh_token: Secret::new(required(REFRESH_TOKEN_ENV)?),
            client_id: id(&config.client_id, CLIENT_ID_ENV)?,
            extension_id: id(&config.extension_id, EXTENSION_ID_ENV)?,
        };
        credentials.validate()?;
        Ok(credentials)
    }

    /// Fail fast on any blank field
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(ReleaseError::missing_credential("client_id"));
        }
        if self.client_secret.is_empty() {
            return Err(ReleaseError::missing_credential(CLIENT_SECRET_ENV));
        }
        if self.refresh_token.is_empty() {
            return Err(ReleaseError::missing_credential(REFRESH_TOKEN_ENV));
        }
        if self.extension_id.trim().is_empty() {
            return Err(ReleaseError::missing_credential("extension_id"));
        }
        Ok(())
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

    fn configured() -> PublishConfig {
        PublishConfig {
            client_id: Some("client.apps.example".into()),
            extension_id: Some("abcdefghijklmnop".into()),
            ..PublishConfig::default()
        }
    }

    #[test]
    fn test_secret_is_masked() {
        let secret = Secret::new("hunter2");
        assert_eq!(secret.to_string(), "****");
        assert!(!format!("{:?}", secret).contains("hunter2"));
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let creds = StoreCredentials::from_lookup(
            &configured(),
            lookup(&[(CLIENT_SECRET_ENV, "s3cret"), (REFRESH_TOKEN_ENV, "r3fresh")]),
        )
        .unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("s3cret"));
        assert!(!debug.contains("r3fresh"));
        assert!(debug.contains("abcdefghijklmnop"));
    }

    #[test]
    fn test_missing_secret_fails_fast() {
        let err = StoreCredentials::from_lookup(&configured(), lookup(&[(REFRESH_TOKEN_ENV, "r")]))
            .unwrap_err();
        assert!(matches!(err, ReleaseError::MissingCredential(ref m) if m.contains(CLIENT_SECRET_ENV)));
    }

    #[test]
    fn test_blank_refresh_token_is_missing() {
        let err = StoreCredentials::from_lookup(
            &configured(),
            lookup(&[(CLIENT_SECRET_ENV, "s"), (REFRESH_TOKEN_ENV, "  ")]),
        )
        .unwrap_err();
        assert!(matches!(err, ReleaseError::MissingCredential(ref m) if m.contains(REFRESH_TOKEN_ENV)));
    }

    #[test]
    fn test_ids_fall_back_to_env() {
        let creds = StoreCredentials::from_lookup(
            &PublishConfig::default(),
            lookup(&[
                (CLIENT_SECRET_ENV, "s"),
                (REFRESH_TOKEN_ENV, "r"),
                (CLIENT_ID_ENV, "cid"),
                (EXTENSION_ID_ENV, "eid"),
            ]),
        )
        .unwrap();
        assert_eq!(creds.client_id, "cid");
        assert_eq!(creds.extension_id, "eid");
    }

    #[test]
    fn test_missing_extension_id() {
        let err = StoreCredentials::from_lookup(
            &PublishConfig {
                client_id: Some("cid".into()),
                ..PublishConfig::default()
            },
            lookup(&[(CLIENT_SECRET_ENV, "s"), (REFRESH_TOKEN_ENV, "r")]),
        )
        .unwrap_err();
        assert!(matches!(err, ReleaseError::MissingCredential(_)));
    }
}
