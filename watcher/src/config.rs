//! Watcher configuration.
//!
//! Loaded from `BLOGSYNC_*` environment variables; every field has a default
//! except the article list.

use std::time::Duration;

use blogsync_sdk::types::UserIdentity;
use blogsync_sdk::{ClientConfig, SyncConfig};
use serde::{Deserialize, Serialize};

/// Configuration for the watcher service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Real-time channel URL.
    pub ws_url: String,

    /// REST API base URL.
    pub api_url: String,

    /// Credential token. Without one the watcher polls nothing live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// ID of the user the token belongs to.
    pub user_id: String,

    /// Display name of that user.
    pub username: String,

    /// Articles to follow.
    pub articles: Vec<String>,

    /// Comments per page.
    pub page_size: u32,

    /// Reconnection attempts after a transport failure.
    pub reconnect_attempts: u32,

    /// Delay between reconnection attempts in milliseconds.
    pub reconnect_delay_ms: u64,

    /// Interval between pending-mutation sweeps in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            ws_url: blogsync_sdk::ws::config::DEFAULT_WS_URL.to_string(),
            api_url: blogsync_sdk::client::config::DEFAULT_BASE_URL.to_string(),
            token: None,
            user_id: "watcher".to_string(),
            username: "watcher".to_string(),
            articles: Vec::new(),
            page_size: blogsync_sdk::client::config::DEFAULT_PAGE_SIZE,
            reconnect_attempts: blogsync_sdk::ws::config::DEFAULT_RECONNECT_ATTEMPTS,
            reconnect_delay_ms: blogsync_sdk::ws::config::DEFAULT_RECONNECT_DELAY_MS,
            sweep_interval_secs: 5,
        }
    }
}

impl WatcherConfig {
    /// Creates a configuration following the given articles.
    #[must_use]
    pub fn with_articles(articles: Vec<String>) -> Self {
        Self {
            articles,
            ..Default::default()
        }
    }

    /// Sets the credential token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the channel and API URLs.
    #[must_use]
    pub fn with_urls(mut self, ws_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        self.ws_url = ws_url.into();
        self.api_url = api_url.into();
        self
    }

    /// Sets the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse or the result
    /// is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through a variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse or the result
    /// is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("BLOGSYNC_WS_URL") {
            config.ws_url = url;
        }
        if let Some(url) = lookup("BLOGSYNC_API_URL") {
            config.api_url = url;
        }
        config.token = lookup("BLOGSYNC_TOKEN").filter(|t| !t.is_empty());
        if let Some(id) = lookup("BLOGSYNC_USER_ID") {
            config.user_id = id;
        }
        if let Some(name) = lookup("BLOGSYNC_USERNAME") {
            config.username = name;
        }
        if let Some(articles) = lookup("BLOGSYNC_ARTICLES") {
            config.articles = articles
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(value) = lookup("BLOGSYNC_PAGE_SIZE") {
            config.page_size = parse("BLOGSYNC_PAGE_SIZE", &value)?;
        }
        if let Some(value) = lookup("BLOGSYNC_RECONNECT_ATTEMPTS") {
            config.reconnect_attempts = parse("BLOGSYNC_RECONNECT_ATTEMPTS", &value)?;
        }
        if let Some(value) = lookup("BLOGSYNC_RECONNECT_DELAY_MS") {
            config.reconnect_delay_ms = parse("BLOGSYNC_RECONNECT_DELAY_MS", &value)?;
        }
        if let Some(value) = lookup("BLOGSYNC_SWEEP_INTERVAL_SECS") {
            config.sweep_interval_secs = parse("BLOGSYNC_SWEEP_INTERVAL_SECS", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.articles.is_empty() {
            return Err(ConfigError::NoArticles);
        }

        if !(self.ws_url.starts_with("ws://") || self.ws_url.starts_with("wss://")) {
            return Err(ConfigError::InvalidUrl(self.ws_url.clone()));
        }

        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(self.api_url.clone()));
        }

        if self.page_size == 0 || self.page_size > blogsync_sdk::client::config::MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidPageSize);
        }

        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidSweepInterval);
        }

        Ok(())
    }

    /// Returns the channel configuration.
    #[must_use]
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::new(self.ws_url.clone())
            .with_reconnect_attempts(self.reconnect_attempts)
            .with_reconnect_delay(Duration::from_millis(self.reconnect_delay_ms))
    }

    /// Returns the HTTP configuration.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.api_url.clone()).with_page_size(self.page_size)
    }

    /// Returns the identity the token is used as.
    #[must_use]
    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            id: self.user_id.clone(),
            username: self.username.clone(),
            email: String::new(),
            role: "reader".to_string(),
        }
    }

    /// Returns the pending-mutation sweep interval.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: value.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No article to follow.
    #[error("BLOGSYNC_ARTICLES must name at least one article")]
    NoArticles,

    /// URL with the wrong scheme.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Page size outside what the comment API serves.
    #[error("page_size must be between 1 and 100")]
    InvalidPageSize,

    /// Zero sweep interval.
    #[error("sweep_interval_secs must be > 0")]
    InvalidSweepInterval,

    /// A numeric variable did not parse.
    #[error("{var} must be a valid number, got {value:?}")]
    InvalidNumber {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = WatcherConfig::default();
        assert!(config.articles.is_empty());
        assert!(config.token.is_none());
        assert_eq!(config.page_size, 10);
        assert_eq!(config.reconnect_attempts, 5);
    }

    #[test]
    fn test_config_builder() {
        let config = WatcherConfig::with_articles(vec!["a1".to_string()])
            .with_token("jwt")
            .with_urls("wss://blog.example.com/realtime", "https://blog.example.com/api")
            .with_page_size(20);

        assert!(config.validate().is_ok());
        assert_eq!(config.token.as_deref(), Some("jwt"));
        assert_eq!(config.client_config().page_size, 20);
        assert_eq!(config.sync_config().url, "wss://blog.example.com/realtime");
    }

    #[test]
    fn test_config_from_lookup() {
        let config = WatcherConfig::from_lookup(lookup(&[
            ("BLOGSYNC_ARTICLES", "a1, a2,,"),
            ("BLOGSYNC_TOKEN", "jwt"),
            ("BLOGSYNC_USER_ID", "u7"),
            ("BLOGSYNC_RECONNECT_ATTEMPTS", "0"),
        ]))
        .expect("config");

        assert_eq!(config.articles, vec!["a1".to_string(), "a2".to_string()]);
        assert_eq!(config.token.as_deref(), Some("jwt"));
        assert_eq!(config.identity().id, "u7");
        assert_eq!(config.sync_config().reconnect_attempts, 0);
    }

    #[test]
    fn test_config_from_lookup_invalid_number() {
        let result = WatcherConfig::from_lookup(lookup(&[
            ("BLOGSYNC_ARTICLES", "a1"),
            ("BLOGSYNC_PAGE_SIZE", "ten"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidNumber { .. })));
    }

    #[test]
    fn test_config_validate_invalid() {
        assert_eq!(WatcherConfig::default().validate(), Err(ConfigError::NoArticles));

        let config =
            WatcherConfig::with_articles(vec!["a1".to_string()]).with_urls("http://x", "http://y");
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));

        let config = WatcherConfig::with_articles(vec!["a1".to_string()]).with_page_size(0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidPageSize));

        let config = WatcherConfig::with_articles(vec!["a1".to_string()]).with_page_size(101);
        assert_eq!(config.validate(), Err(ConfigError::InvalidPageSize));
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = WatcherConfig::with_articles(vec!["a1".to_string()]);
        let json = serde_json::to_string(&config).expect("serialize");
        let parsed: WatcherConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, config);
    }
}
