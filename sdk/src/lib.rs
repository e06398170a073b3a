//! Blogsync SDK - real-time comment synchronization for the Blogsync blog.
//!
//! Keeps the comments of rendered articles in step with the server: one
//! shared real-time channel, per-article rooms, typed event streams and
//! optimistic local mutations reconciled against server confirmations.
//!
//! # Modules
//!
//! - [`ws`] - the shared channel: [`ConnectionManager`], rooms, the
//!   [`EventRouter`] and channel metrics
//! - [`sync`] - [`CommentTree`], [`PendingBuffer`], [`reconcile`],
//!   [`CommentSection`] and [`ArticleLikes`]
//! - [`client`] - the REST collaborator ([`HttpClient`])
//! - [`session`] - credential store and session-expiry recovery
//! - [`notifications`] - the notification bell feed
//! - [`push`] - push-subscription registration
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use blogsync_sdk::{
//!     ClientConfig, CommentSection, ConnectionManager, HttpClient, SyncConfig,
//! };
//!
//! let api = Arc::new(HttpClient::new(ClientConfig::default(), session.clone())?);
//! let connection = ConnectionManager::websocket(SyncConfig::default(), session)?;
//!
//! let mut section = CommentSection::open("a1", api, connection, 10).await?;
//! section.submit_comment("hello").await?;
//! while let Some(update) = section.next_update().await {
//!     println!("{:?}", update);
//! }
//! ```

pub mod client;
pub mod error;
pub mod notifications;
pub mod push;
pub mod session;
pub mod sync;
pub mod types;
pub mod ws;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ArticleApi, ClientConfig, ClientError, CommentApi, HttpClient, PushRegistrar};
pub use error::SyncError;
pub use notifications::NotificationFeed;
pub use push::{register_push, PushError, PushPermission, PushPlatform};
pub use session::{
    LoggingNavigator, MemorySession, Navigator, SessionGuard, SessionStore,
    SESSION_EXPIRED_MESSAGE,
};
pub use sync::{
    reconcile, ArticleLikes, CommentSection, CommentTree, PendingBuffer, ReconcileOutcome,
    SectionUpdate, Submitted,
};
pub use types::{
    ArticleLikeResponse, ArticleLikeState, Comment, CommentAuthor, CommentPage, Notification,
    NotificationEvent, NotificationKind, PushSubscription, UserIdentity,
};
pub use ws::{
    ConnectionLease, ConnectionManager, ConnectionState, EventRouter, SyncConfig, SyncMetrics,
    WsError,
};
