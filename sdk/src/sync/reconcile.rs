//! Reconciliation of confirmed comments against optimistic state.
//!
//! [`reconcile`] is pure over the buffer and the tree so every ordering of
//! echoes, duplicates and foreign events can be exercised without a channel.

use super::pending::PendingBuffer;
use super::tree::{CommentEntry, CommentTree, TreeError};
use crate::types::Comment;

/// Why a confirmed comment left the tree unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The comment belongs to another article.
    ForeignArticle,
    /// The reply's parent is not loaded in this view.
    OrphanReply {
        /// Missing parent ID.
        parent_id: String,
    },
}

/// Result of reconciling one confirmed comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A provisional entry was replaced in place.
    Replaced {
        /// The resolved synthetic ID.
        synthetic_id: String,
        /// The confirmed ID.
        id: String,
    },
    /// No provisional entry matched; the comment was prepended.
    Inserted {
        /// The confirmed ID.
        id: String,
    },
    /// The ID was already present; its entry was refreshed.
    Refreshed {
        /// The confirmed ID.
        id: String,
    },
    /// The tree is unchanged.
    Ignored(IgnoreReason),
}

/// Applies a server-confirmed comment to a view.
///
/// In order: comments for other articles are ignored; a known identifier is
/// refreshed in place, so redelivery never duplicates; the matching pending
/// mutation, if any, has its provisional entry replaced in place and is
/// confirmed; otherwise the comment is prepended.
pub fn reconcile(
    buffer: &mut PendingBuffer,
    tree: &mut CommentTree,
    incoming: Comment,
) -> ReconcileOutcome {
    if incoming.article != tree.article_id() {
        return ReconcileOutcome::Ignored(IgnoreReason::ForeignArticle);
    }

    let id = incoming.id.clone();
    if tree.contains(&id) {
        tree.refresh(incoming);
        return ReconcileOutcome::Refreshed { id };
    }

    let echo = buffer.find_echo(&incoming).map(|m| m.synthetic_id.clone());
    if let Some(synthetic_id) = echo {
        buffer.confirm(&synthetic_id, &id);
        if tree.replace(&synthetic_id, incoming.clone()).is_ok() {
            return ReconcileOutcome::Replaced { synthetic_id, id };
        }
    }

    match tree.insert(CommentEntry::confirmed(incoming)) {
        Ok(_) => ReconcileOutcome::Inserted { id },
        Err(TreeError::ParentNotFound(parent_id)) => {
            ReconcileOutcome::Ignored(IgnoreReason::OrphanReply { parent_id })
        }
        Err(_) => ReconcileOutcome::Refreshed { id },
    }
}
