//! Optimistic comment synchronization.
//!
//! - [`CommentTree`] holds one article's threads: top-level comments, newest
//!   first, each with a flat list of replies.
//! - [`PendingBuffer`] tracks locally initiated mutations until they are
//!   confirmed or rolled back.
//! - [`reconcile`] applies a confirmed comment to both.
//! - [`CommentSection`] ties them to the shared connection and the CRUD
//!   collaborator for one rendered article.
//! - [`ArticleLikes`] keeps article like counters in step with the server.

pub mod likes;
pub mod pending;
pub mod reconcile;
pub mod section;
pub mod tree;

pub use likes::ArticleLikes;
pub use pending::{DispatchPath, MutationKind, MutationState, PendingBuffer, PendingMutation};
pub use reconcile::{reconcile, IgnoreReason, ReconcileOutcome};
pub use section::{CommentSection, PageInfo, SectionUpdate, Submitted};
pub use tree::{CommentEntry, CommentThread, CommentTree, EntryState, Location, TreeError};
