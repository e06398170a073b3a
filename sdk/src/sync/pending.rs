//! Optimistic mutation buffer.
//!
//! Every locally initiated mutation gets a synthetic identifier and waits
//! here, oldest first, until it is confirmed by a server echo or response,
//! or fails. Resolution removes it from the buffer and hands back the record
//! in its final state.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::types::Comment;

/// What a pending mutation creates or toggles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// A top-level comment.
    Comment,
    /// A reply to `parent_id`.
    Reply {
        /// Parent comment ID.
        parent_id: String,
    },
    /// A like toggle on a comment or article.
    Like {
        /// Liked entity ID.
        target_id: String,
    },
}

impl MutationKind {
    fn synthetic_prefix(&self) -> &'static str {
        match self {
            Self::Comment => "temp",
            Self::Reply { .. } => "temp_reply",
            Self::Like { .. } => "temp_like",
        }
    }

    /// Returns true if a confirmed comment has this structural kind.
    #[must_use]
    pub fn matches(&self, comment: &Comment) -> bool {
        match (self, comment.parent_comment.as_deref()) {
            (Self::Comment, None) => true,
            (Self::Reply { parent_id }, Some(parent)) => parent_id == parent,
            _ => false,
        }
    }
}

/// Lifecycle of a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationState {
    /// Awaiting confirmation.
    Pending,
    /// Confirmed under a server identifier.
    Confirmed {
        /// Server-assigned ID.
        id: String,
    },
    /// Rolled back.
    Failed {
        /// Why it failed.
        reason: String,
    },
}

/// How a mutation was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchPath {
    /// Emitted over the real-time channel.
    Channel,
    /// Sent as a request to the CRUD collaborator.
    Request,
}

/// A locally initiated mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    /// Synthetic identifier.
    pub synthetic_id: String,
    /// What it creates.
    pub kind: MutationKind,
    /// Target article.
    pub article_id: String,
    /// Local author.
    pub author_id: String,
    /// Submitted body text, empty for likes.
    pub content: String,
    /// Local submission time.
    pub submitted_at: DateTime<Utc>,
    /// Dispatch path.
    pub path: DispatchPath,
    /// Lifecycle state.
    pub state: MutationState,
}

/// FIFO buffer of pending mutations.
#[derive(Debug, Clone, Default)]
pub struct PendingBuffer {
    entries: VecDeque<PendingMutation>,
    sequence: u64,
}

impl PendingBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of pending mutations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates pending mutations, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PendingMutation> {
        self.entries.iter()
    }

    /// Returns a pending mutation.
    #[must_use]
    pub fn get(&self, synthetic_id: &str) -> Option<&PendingMutation> {
        self.entries.iter().find(|m| m.synthetic_id == synthetic_id)
    }

    /// Records a new mutation and returns its synthetic identifier.
    ///
    /// Identifiers carry the submission time and a per-buffer sequence so
    /// two submissions in the same millisecond stay distinct.
    pub fn begin(
        &mut self,
        kind: MutationKind,
        article_id: &str,
        author_id: &str,
        content: &str,
        path: DispatchPath,
        now: DateTime<Utc>,
    ) -> String {
        self.sequence += 1;
        let synthetic_id = format!(
            "{}_{}_{}",
            kind.synthetic_prefix(),
            now.timestamp_millis(),
            self.sequence
        );

        self.entries.push_back(PendingMutation {
            synthetic_id: synthetic_id.clone(),
            kind,
            article_id: article_id.to_string(),
            author_id: author_id.to_string(),
            content: content.to_string(),
            submitted_at: now,
            path,
            state: MutationState::Pending,
        });
        synthetic_id
    }

    /// Records a like toggle unless one is already in flight for the target.
    pub fn begin_like(
        &mut self,
        target_id: &str,
        article_id: &str,
        author_id: &str,
        now: DateTime<Utc>,
    ) -> Option<String> {
        let in_flight = self.entries.iter().any(|m| {
            matches!(&m.kind, MutationKind::Like { target_id: t } if t == target_id)
        });
        if in_flight {
            return None;
        }

        Some(self.begin(
            MutationKind::Like {
                target_id: target_id.to_string(),
            },
            article_id,
            author_id,
            "",
            DispatchPath::Request,
            now,
        ))
    }

    /// Changes a mutation's dispatch path.
    pub fn set_path(&mut self, synthetic_id: &str, path: DispatchPath) {
        if let Some(m) = self
            .entries
            .iter_mut()
            .find(|m| m.synthetic_id == synthetic_id)
        {
            m.path = path;
        }
    }

    /// Finds the pending mutation a confirmed comment answers.
    ///
    /// Candidates share the article, the structural kind (and parent for
    /// replies) and the author. Among them an exact content match wins;
    /// otherwise the oldest candidate is taken.
    #[must_use]
    pub fn find_echo(&self, comment: &Comment) -> Option<&PendingMutation> {
        let mut candidates = self.entries.iter().filter(|m| {
            m.state == MutationState::Pending
                && m.article_id == comment.article
                && m.author_id == comment.author.id
                && m.kind.matches(comment)
        });

        let oldest = candidates.clone().next();
        candidates
            .find(|m| m.content == comment.content)
            .or(oldest)
    }

    /// Returns the oldest channel-path comment or reply for an article.
    #[must_use]
    pub fn oldest_on_channel(&self, article_id: &str) -> Option<&PendingMutation> {
        self.entries.iter().find(|m| {
            m.path == DispatchPath::Channel
                && m.article_id == article_id
                && !matches!(m.kind, MutationKind::Like { .. })
        })
    }

    fn take(&mut self, synthetic_id: &str) -> Option<PendingMutation> {
        let index = self
            .entries
            .iter()
            .position(|m| m.synthetic_id == synthetic_id)?;
        self.entries.remove(index)
    }

    /// Resolves a mutation as confirmed under `id`.
    pub fn confirm(&mut self, synthetic_id: &str, id: &str) -> Option<PendingMutation> {
        let mut mutation = self.take(synthetic_id)?;
        mutation.state = MutationState::Confirmed { id: id.to_string() };
        Some(mutation)
    }

    /// Resolves a mutation as failed.
    pub fn fail(&mut self, synthetic_id: &str, reason: impl Into<String>) -> Option<PendingMutation> {
        let mut mutation = self.take(synthetic_id)?;
        mutation.state = MutationState::Failed {
            reason: reason.into(),
        };
        Some(mutation)
    }

    /// Returns the synthetic identifiers pending for longer than `ttl`.
    #[must_use]
    pub fn expired(&self, now: DateTime<Utc>, ttl: Duration) -> Vec<String> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        self.entries
            .iter()
            .filter(|m| now.signed_duration_since(m.submitted_at) > ttl)
            .map(|m| m.synthetic_id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{other_author, server_comment, user};

    fn begin_comment(buffer: &mut PendingBuffer, content: &str) -> String {
        buffer.begin(
            MutationKind::Comment,
            "a1",
            "u1",
            content,
            DispatchPath::Channel,
            Utc::now(),
        )
    }

    #[test]
    fn test_synthetic_ids_distinct() {
        let mut buffer = PendingBuffer::new();
        let now = Utc::now();
        let a = buffer.begin(MutationKind::Comment, "a1", "u1", "x", DispatchPath::Channel, now);
        let b = buffer.begin(MutationKind::Comment, "a1", "u1", "x", DispatchPath::Channel, now);
        let r = buffer.begin(
            MutationKind::Reply {
                parent_id: "c1".to_string(),
            },
            "a1",
            "u1",
            "x",
            DispatchPath::Channel,
            now,
        );

        assert_ne!(a, b);
        assert!(a.starts_with("temp_"));
        assert!(r.starts_with("temp_reply_"));
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_find_echo_prefers_content_then_oldest() {
        let mut buffer = PendingBuffer::new();
        let first = begin_comment(&mut buffer, "one");
        let second = begin_comment(&mut buffer, "two");

        let echo = server_comment("c2", "a1", user().as_author(), "two", None);
        assert_eq!(buffer.find_echo(&echo).map(|m| m.synthetic_id.clone()), Some(second));

        let edited = server_comment("c9", "a1", user().as_author(), "trimmed", None);
        assert_eq!(buffer.find_echo(&edited).map(|m| m.synthetic_id.clone()), Some(first));
    }

    #[test]
    fn test_find_echo_requires_kind_author_and_article() {
        let mut buffer = PendingBuffer::new();
        buffer.begin(
            MutationKind::Reply {
                parent_id: "c1".to_string(),
            },
            "a1",
            "u1",
            "hi",
            DispatchPath::Channel,
            Utc::now(),
        );

        let top = server_comment("c2", "a1", user().as_author(), "hi", None);
        let other_parent = server_comment("r1", "a1", user().as_author(), "hi", Some("c9"));
        let other_user = server_comment("r2", "a1", other_author(), "hi", Some("c1"));
        let other_article = server_comment("r3", "a2", user().as_author(), "hi", Some("c1"));
        let echo = server_comment("r4", "a1", user().as_author(), "hi", Some("c1"));

        assert!(buffer.find_echo(&top).is_none());
        assert!(buffer.find_echo(&other_parent).is_none());
        assert!(buffer.find_echo(&other_user).is_none());
        assert!(buffer.find_echo(&other_article).is_none());
        assert!(buffer.find_echo(&echo).is_some());
    }

    #[test]
    fn test_confirm_and_fail_resolve() {
        let mut buffer = PendingBuffer::new();
        let a = begin_comment(&mut buffer, "one");
        let b = begin_comment(&mut buffer, "two");

        let confirmed = buffer.confirm(&a, "c1").expect("confirmed");
        assert_eq!(confirmed.state, MutationState::Confirmed { id: "c1".to_string() });

        let failed = buffer.fail(&b, "rejected").expect("failed");
        assert!(matches!(failed.state, MutationState::Failed { .. }));

        assert!(buffer.is_empty());
        assert!(buffer.confirm(&a, "c1").is_none());
    }

    #[test]
    fn test_begin_like_once_per_target() {
        let mut buffer = PendingBuffer::new();
        let now = Utc::now();
        let first = buffer.begin_like("c1", "a1", "u1", now).expect("first");
        assert!(buffer.begin_like("c1", "a1", "u1", now).is_none());
        assert!(buffer.begin_like("c2", "a1", "u1", now).is_some());

        buffer.confirm(&first, "c1");
        assert!(buffer.begin_like("c1", "a1", "u1", now).is_some());
    }

    #[test]
    fn test_oldest_on_channel() {
        let mut buffer = PendingBuffer::new();
        let now = Utc::now();
        buffer.begin(MutationKind::Comment, "a1", "u1", "rest", DispatchPath::Request, now);
        let channel = begin_comment(&mut buffer, "live");

        assert_eq!(
            buffer.oldest_on_channel("a1").map(|m| m.synthetic_id.clone()),
            Some(channel.clone())
        );
        buffer.set_path(&channel, DispatchPath::Request);
        assert!(buffer.oldest_on_channel("a1").is_none());
    }

    #[test]
    fn test_expired() {
        let mut buffer = PendingBuffer::new();
        let then = Utc::now() - chrono::Duration::seconds(60);
        let old = buffer.begin(MutationKind::Comment, "a1", "u1", "x", DispatchPath::Channel, then);
        begin_comment(&mut buffer, "fresh");

        assert_eq!(buffer.expired(Utc::now(), Duration::from_secs(30)), vec![old]);
    }
}
