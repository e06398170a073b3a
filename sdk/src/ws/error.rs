//! Channel error types.
//!
//! Provides error types for real-time channel operations.

use std::fmt;

/// Reason fragments that mark a connect failure as authentication-class.
const AUTH_MARKERS: [&str; 5] = ["auth", "unauthorized", "forbidden", "jwt", "token"];

/// Channel errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsError {
    /// Connection failed at the transport level.
    Connection(String),

    /// The server rejected the credential.
    Auth(String),

    /// A connect attempt exceeded its ceiling.
    Timeout,

    /// WebSocket protocol error.
    Protocol(String),

    /// Failed to serialize message.
    Serialization(String),

    /// Failed to deserialize message.
    Deserialization(String),

    /// Inbound event name this client does not route.
    UnknownEvent(String),

    /// No credential available to connect with.
    MissingToken,

    /// Not connected.
    NotConnected,

    /// Connection closed.
    Closed,

    /// Invalid configuration.
    InvalidConfig(String),

    /// Send failed.
    SendFailed(String),
}

impl WsError {
    /// Returns true if this error means the credential was rejected.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::Auth(_) => true,
            Self::Connection(reason) => is_auth_reason(reason),
            _ => false,
        }
    }
}

/// Returns true if a server-provided reason names an authentication problem.
#[must_use]
pub fn is_auth_reason(reason: &str) -> bool {
    let reason = reason.to_ascii_lowercase();
    AUTH_MARKERS.iter().any(|marker| reason.contains(marker))
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(msg) => write!(f, "connection failed: {}", msg),
            Self::Auth(msg) => write!(f, "authentication rejected: {}", msg),
            Self::Timeout => write!(f, "connect attempt timed out"),
            Self::Protocol(msg) => write!(f, "protocol error: {}", msg),
            Self::Serialization(msg) => write!(f, "serialization failed: {}", msg),
            Self::Deserialization(msg) => write!(f, "deserialization failed: {}", msg),
            Self::UnknownEvent(name) => write!(f, "unknown event: {}", name),
            Self::MissingToken => write!(f, "no credential token"),
            Self::NotConnected => write!(f, "not connected"),
            Self::Closed => write!(f, "connection closed"),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            Self::SendFailed(msg) => write!(f, "send failed: {}", msg),
        }
    }
}

impl std::error::Error for WsError {}

impl From<tokio_tungstenite::tungstenite::Error> for WsError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::http::StatusCode;
        use tokio_tungstenite::tungstenite::Error;

        match err {
            Error::Http(response) => {
                let status = response.status();
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    Self::Auth(format!("handshake rejected with {}", status))
                } else {
                    Self::Connection(format!("handshake rejected with {}", status))
                }
            }
            Error::Io(e) => Self::Connection(e.to_string()),
            Error::ConnectionClosed | Error::AlreadyClosed => Self::Closed,
            other => Self::Protocol(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_error_display() {
        let err = WsError::Connection("timeout".to_string());
        assert_eq!(err.to_string(), "connection failed: timeout");
    }

    #[test]
    fn test_ws_error_auth_display() {
        let err = WsError::Auth("invalid token".to_string());
        assert_eq!(err.to_string(), "authentication rejected: invalid token");
    }

    #[test]
    fn test_ws_error_not_connected() {
        let err = WsError::NotConnected;
        assert_eq!(err.to_string(), "not connected");
    }

    #[test]
    fn test_ws_error_is_auth_failure() {
        assert!(WsError::Auth("nope".to_string()).is_auth_failure());
        assert!(WsError::Connection("Authentication error".to_string()).is_auth_failure());
        assert!(WsError::Connection("jwt expired".to_string()).is_auth_failure());
        assert!(!WsError::Connection("connection refused".to_string()).is_auth_failure());
        assert!(!WsError::Timeout.is_auth_failure());
    }

    #[test]
    fn test_is_auth_reason() {
        assert!(is_auth_reason("Unauthorized"));
        assert!(!is_auth_reason("xhr poll error"));
    }
}
