//! Real-time channel.
//!
//! One [`ConnectionManager`] owns the channel to the real-time server. It
//! decodes inbound frames into [`InboundEvent`] once and fans them out
//! through the [`EventRouter`] to every subscribed view.
//!
//! # Example
//!
//! ```rust,ignore
//! use blogsync_sdk::ws::{ConnectionManager, SyncConfig};
//!
//! let manager = ConnectionManager::websocket(SyncConfig::default(), session)?;
//! let _lease = manager.lease("jwt")?;
//! manager.join_article_room("a1");
//!
//! let mut comments = manager.router().subscribe_comments();
//! while let Ok(added) = comments.recv().await {
//!     println!("{}: {}", added.comment.display_author(), added.comment.content);
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod messages;
pub mod metrics;
pub mod rooms;
pub mod router;
pub mod transport;

pub use config::SyncConfig;
pub use connection::{ConnectionLease, ConnectionManager, ConnectionState};
pub use error::WsError;
pub use messages::{
    ArticleLiked, ClientMessage, CommentAdded, CommentError, CommentEventKind, ConnectError,
    EventCategory, InboundEvent, NewComment,
};
pub use metrics::{SyncMetrics, SyncMetricsSnapshot};
pub use rooms::RoomTracker;
pub use router::EventRouter;
pub use transport::{ChannelHandle, Transport, TransportEvent, WsTransport};
