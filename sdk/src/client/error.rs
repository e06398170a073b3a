//! Client error types.
//!
//! Failures of the blog REST API as seen by the engine. A 401 has already
//! expired the session by the time [`ClientError::Unauthorized`] is returned.

use std::fmt;

/// Client errors.
#[derive(Debug)]
pub enum ClientError {
    /// Transport-level failure.
    Request(reqwest::Error),

    /// The response body did not match the expected shape.
    Deserialization(String),

    /// The server refused the comment (400), e.g. empty or too long content.
    Validation(String),

    /// Any other non-success status.
    Api {
        /// HTTP status code.
        status: u16,
        /// Server message, or the raw body.
        message: String,
    },

    /// Rate limited (429).
    RateLimited {
        /// Seconds the server asked us to wait.
        retry_after: Option<u64>,
    },

    /// The comment, article or route does not exist (404).
    NotFound(String),

    /// The credential was rejected (401) on this path.
    Unauthorized {
        /// Request path that triggered the expiry.
        path: String,
    },

    /// The caller may not act on the resource (403), e.g. editing someone
    /// else's comment.
    Forbidden(String),

    /// Invalid configuration.
    InvalidConfig(String),

    /// Request timeout.
    Timeout,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(e) => write!(f, "blog api unreachable: {}", e),
            Self::Deserialization(msg) => write!(f, "unexpected response: {}", msg),
            Self::Validation(msg) => write!(f, "rejected by server: {}", msg),
            Self::Api { status, message } => write!(f, "blog api error {}: {}", status, message),
            Self::RateLimited {
                retry_after: Some(secs),
            } => write!(f, "rate limited, retry in {}s", secs),
            Self::RateLimited { retry_after: None } => write!(f, "rate limited"),
            Self::NotFound(path) => write!(f, "not found: {}", path),
            Self::Unauthorized { path } => write!(f, "session expired on {}", path),
            Self::Forbidden(msg) => write!(f, "not allowed: {}", msg),
            Self::InvalidConfig(msg) => write!(f, "invalid client configuration: {}", msg),
            Self::Timeout => write!(f, "request timed out"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request(e) => Some(e),
            _ => None,
        }
    }
}

impl ClientError {
    /// Returns true if the request may be retried unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::RateLimited { .. })
    }

    /// Returns true if this error ended the session.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(err)
        }
    }
}
