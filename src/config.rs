use crate::error::ConfigError;
use crate::twitter_client::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const MIN_PAGE_SIZE: u32 = 5;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Optional run configuration. Every field has a default, so an empty `{}` is valid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub page_size: u32,
    /// Client-side pacing of unlike/delete calls; `0` disables it.
    pub mutations_per_minute: u32,
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: String::from("https://api.twitter.com"),
            page_size: MAX_PAGE_SIZE,
            mutations_per_minute: 50,
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::Invalid(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError::Invalid(format!("{}: {e}", path.display())))?;
        Ok(config.normalized())
    }

    /// The API only accepts `max_results` in 5..=100.
    pub fn normalized(self) -> Self {
        Self {
            page_size: self.page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE),
            api_url: self.api_url.trim_end_matches('/').to_string(),
            ..self
        }
    }
}
