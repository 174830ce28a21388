use crate::error::ConfigError;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

pub const API_KEY: &str = "API_KEY";
pub const API_SECRET: &str = "API_SECRET";
pub const ACCESS_TOKEN: &str = "ACCESS_TOKEN";
pub const ACCESS_TOKEN_SECRET: &str = "ACCESS_TOKEN_SECRET";

/// The four OAuth 1.0a user-context secrets. Held in memory only; [Debug] never prints them.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    consumer_key: String,
    consumer_secret: String,
    access_token: String,
    access_token_secret: String,
}

impl Credentials {
    pub fn new(
        consumer_key: &str,
        consumer_secret: &str,
        access_token: &str,
        access_token_secret: &str,
    ) -> Self {
        Self {
            consumer_key: consumer_key.to_string(),
            consumer_secret: consumer_secret.to_string(),
            access_token: access_token.to_string(),
            access_token_secret: access_token_secret.to_string(),
        }
    }

    /// Reads the `.env`-style file at `path`. Only the file is consulted, not the process
    /// environment, so a stale exported variable cannot stand in for a missing key.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let read_error = |source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        };
        let mut vars = HashMap::new();
        for item in dotenvy::from_path_iter(path).map_err(read_error)? {
            let (key, value) = item.map_err(read_error)?;
            vars.insert(key, value);
        }

        let get = |key: &str| vars.get(key).map(String::as_str).unwrap_or_default();
        let credentials = Self::new(
            get(API_KEY),
            get(API_SECRET),
            get(ACCESS_TOKEN),
            get(ACCESS_TOKEN_SECRET),
        );
        credentials.validate()?;
        Ok(credentials)
    }

    /// Fails on the first absent or blank secret.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            (API_KEY, &self.consumer_key),
            (API_SECRET, &self.consumer_secret),
            (ACCESS_TOKEN, &self.access_token),
            (ACCESS_TOKEN_SECRET, &self.access_token_secret),
        ];
        for (key, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingCredential(key));
            }
        }
        Ok(())
    }

    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    pub fn consumer_secret(&self) -> &str {
        &self.consumer_secret
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn access_token_secret(&self) -> &str {
        &self.access_token_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &redact(&self.consumer_key))
            .field("consumer_secret", &"<redacted>")
            .field("access_token", &redact(&self.access_token))
            .field("access_token_secret", &"<redacted>")
            .finish()
    }
}

// Keeps a short prefix so operators can tell which key is loaded.
fn redact(value: &str) -> String {
    let prefix: String = value.chars().take(4).collect();
    format!("{prefix}…")
}
