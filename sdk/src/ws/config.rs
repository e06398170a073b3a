//! Channel configuration.
//!
//! Provides configuration options for the real-time channel.

use std::time::Duration;

/// Default channel URL.
pub const DEFAULT_WS_URL: &str = "ws://localhost:5002/realtime";

/// Default number of reconnection attempts after a transport failure.
pub const DEFAULT_RECONNECT_ATTEMPTS: u32 = 5;

/// Default fixed delay between reconnection attempts in milliseconds.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1_000;

/// Default per-attempt connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 20;

/// Default heartbeat interval in seconds.
pub const DEFAULT_HEARTBEAT_SECS: u64 = 25;

/// Default capacity of the outbound frame queue.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Default capacity of each typed event stream.
pub const DEFAULT_EVENT_CAPACITY: usize = 1_000;

/// Default lifetime of an unconfirmed optimistic mutation in seconds.
pub const DEFAULT_PENDING_TIMEOUT_SECS: u64 = 30;

/// Real-time channel configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Channel URL.
    pub url: String,

    /// Reconnection attempts after the first failed attempt (0 disables reconnection).
    pub reconnect_attempts: u32,

    /// Fixed delay between attempts.
    pub reconnect_delay: Duration,

    /// Ceiling for a single connect attempt.
    pub connect_timeout: Duration,

    /// Heartbeat interval.
    pub heartbeat_interval: Duration,

    /// Outbound frame queue capacity.
    pub outbound_capacity: usize,

    /// Per-stream event buffer capacity.
    pub event_capacity: usize,

    /// How long an optimistic mutation may wait for confirmation.
    pub pending_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            pending_timeout: Duration::from_secs(DEFAULT_PENDING_TIMEOUT_SECS),
        }
    }
}

impl SyncConfig {
    /// Creates a new configuration with the given URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the number of reconnection attempts.
    #[must_use]
    pub fn with_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.reconnect_attempts = attempts;
        self
    }

    /// Sets the delay between reconnection attempts.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets the per-attempt connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the heartbeat interval.
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the event stream capacity.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Sets the pending mutation timeout.
    #[must_use]
    pub fn with_pending_timeout(mut self, timeout: Duration) -> Self {
        self.pending_timeout = timeout;
        self
    }

    /// Returns the connection URL carrying the credential token.
    ///
    /// The token is form-encoded into the query so tokens holding `+`, `&`
    /// or `=` reach the server intact.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::InvalidConfig`](super::error::WsError::InvalidConfig)
    /// if the channel URL does not parse.
    pub fn connection_url(&self, token: &str) -> Result<String, super::error::WsError> {
        let mut url = reqwest::Url::parse(&self.url)
            .map_err(|e| super::error::WsError::InvalidConfig(format!("url: {}", e)))?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url.into())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), super::error::WsError> {
        if self.url.is_empty() {
            return Err(super::error::WsError::InvalidConfig(
                "url cannot be empty".to_string(),
            ));
        }

        if !self.url.starts_with("ws://") && !self.url.starts_with("wss://") {
            return Err(super::error::WsError::InvalidConfig(
                "url must start with ws:// or wss://".to_string(),
            ));
        }

        if self.connect_timeout.is_zero() || self.heartbeat_interval.is_zero() {
            return Err(super::error::WsError::InvalidConfig(
                "connect_timeout and heartbeat_interval must be > 0".to_string(),
            ));
        }

        if self.outbound_capacity == 0 || self.event_capacity == 0 {
            return Err(super::error::WsError::InvalidConfig(
                "queue capacities must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = SyncConfig::default();
        assert_eq!(config.url, DEFAULT_WS_URL);
        assert_eq!(config.reconnect_attempts, DEFAULT_RECONNECT_ATTEMPTS);
        assert_eq!(
            config.reconnect_delay,
            Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS)
        );
        assert_eq!(
            config.connect_timeout,
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_config_builder() {
        let config = SyncConfig::new("wss://example.com/rt")
            .with_reconnect_attempts(2)
            .with_reconnect_delay(Duration::from_millis(250))
            .with_connect_timeout(Duration::from_secs(3))
            .with_heartbeat_interval(Duration::from_secs(10))
            .with_event_capacity(16)
            .with_pending_timeout(Duration::from_secs(5));

        assert_eq!(config.url, "wss://example.com/rt");
        assert_eq!(config.reconnect_attempts, 2);
        assert_eq!(config.reconnect_delay, Duration::from_millis(250));
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(10));
        assert_eq!(config.event_capacity, 16);
        assert_eq!(config.pending_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_config_connection_url() {
        let config = SyncConfig::new("wss://example.com/rt");
        assert_eq!(
            config.connection_url("abc").expect("url"),
            "wss://example.com/rt?token=abc"
        );

        let config = SyncConfig::new("wss://example.com/rt?v=2");
        assert_eq!(
            config.connection_url("abc").expect("url"),
            "wss://example.com/rt?v=2&token=abc"
        );
    }

    #[test]
    fn test_connection_url_encodes_token() {
        let config = SyncConfig::new("wss://blog.example.com/rt");
        let url = config.connection_url("eyJ+a/b=&c#d").expect("url");
        assert_eq!(url, "wss://blog.example.com/rt?token=eyJ%2Ba%2Fb%3D%26c%23d");

        let parsed = reqwest::Url::parse(&url).expect("parse");
        let token = parsed
            .query_pairs()
            .find(|(key, _)| key == "token")
            .map(|(_, value)| value.into_owned());
        assert_eq!(token.as_deref(), Some("eyJ+a/b=&c#d"));
    }

    #[test]
    fn test_connection_url_rejects_unparseable() {
        assert!(SyncConfig::new("wss://").connection_url("abc").is_err());
    }

    #[test]
    fn test_config_validate() {
        assert!(SyncConfig::new("wss://example.com/rt").validate().is_ok());
        assert!(SyncConfig::new("").validate().is_err());
        assert!(SyncConfig::new("https://example.com").validate().is_err());
        assert!(SyncConfig::new("ws://example.com")
            .with_event_capacity(0)
            .validate()
            .is_err());
    }
}
