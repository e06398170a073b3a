//! SDK error types.
//!
//! [`SyncError`] is what comment views and like counters return; it wraps
//! the HTTP, channel and tree errors underneath.

use crate::client::ClientError;
use crate::sync::TreeError;
use crate::ws::WsError;

/// Synchronization errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A call to the CRUD collaborator failed.
    #[error("request failed: {0}")]
    Request(#[from] ClientError),

    /// The real-time channel failed.
    #[error("channel error: {0}")]
    Channel(#[from] WsError),

    /// The comment tree rejected a change.
    #[error("comment tree: {0}")]
    Tree(#[from] TreeError),

    /// No signed-in user.
    #[error("not signed in")]
    NotAuthenticated,

    /// Comment body is empty.
    #[error("comment content is empty")]
    EmptyContent,

    /// A like toggle for the target is already in flight.
    #[error("like already in flight for {0}")]
    LikeInFlight(String),
}

impl SyncError {
    /// Returns true if the caller's session is no longer valid.
    #[must_use]
    pub fn is_session_error(&self) -> bool {
        match self {
            Self::NotAuthenticated => true,
            Self::Request(err) => err.is_session_expired(),
            Self::Channel(err) => err.is_auth_failure(),
            _ => false,
        }
    }
}
