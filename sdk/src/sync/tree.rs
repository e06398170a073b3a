//! Per-article comment tree.
//!
//! Top-level comments are threads; every reply, including a reply to a
//! reply, lives one level down in its thread's reply list. Both lists are
//! most-recent-first. An identifier appears at most once in the tree.

use std::collections::HashSet;
use std::mem;

use thiserror::Error;

use crate::types::Comment;

/// Whether an entry has been confirmed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryState {
    /// Server-assigned identifier.
    Confirmed,
    /// Optimistic entry awaiting confirmation.
    Provisional,
}

/// A comment with its confirmation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentEntry {
    /// The comment. Its `replies` field is always empty; replies live in
    /// the owning [`CommentThread`].
    pub comment: Comment,
    /// Confirmation state.
    pub state: EntryState,
}

impl CommentEntry {
    /// Wraps a server-confirmed comment.
    #[must_use]
    pub fn confirmed(comment: Comment) -> Self {
        Self {
            comment,
            state: EntryState::Confirmed,
        }
    }

    /// Wraps an optimistic comment.
    #[must_use]
    pub fn provisional(comment: Comment) -> Self {
        Self {
            comment,
            state: EntryState::Provisional,
        }
    }

    /// Returns the entry's identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.comment.id
    }

    /// Returns true if the entry awaits confirmation.
    #[must_use]
    pub fn is_provisional(&self) -> bool {
        self.state == EntryState::Provisional
    }
}

/// A top-level comment and its flattened replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentThread {
    /// The top-level comment.
    pub entry: CommentEntry,
    /// Replies, most recent first.
    pub replies: Vec<CommentEntry>,
}

/// Position of an entry in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// A top-level comment at this index.
    Root(usize),
    /// A reply.
    Reply {
        /// Index of the owning thread.
        thread: usize,
        /// Index within the thread's replies.
        index: usize,
    },
}

/// Tree mutation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The reply's parent is not in the tree.
    #[error("parent comment not found: {0}")]
    ParentNotFound(String),

    /// The identifier is already in the tree.
    #[error("duplicate comment id: {0}")]
    DuplicateId(String),

    /// The comment belongs to another article.
    #[error("comment belongs to article {found}, expected {expected}")]
    ArticleMismatch {
        /// This tree's article.
        expected: String,
        /// The comment's article.
        found: String,
    },

    /// No entry with this identifier.
    #[error("comment not found: {0}")]
    NotFound(String),
}

/// The comment tree for one article view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentTree {
    article_id: String,
    threads: Vec<CommentThread>,
}

impl CommentTree {
    /// Creates an empty tree for an article.
    #[must_use]
    pub fn new(article_id: impl Into<String>) -> Self {
        Self {
            article_id: article_id.into(),
            threads: Vec::new(),
        }
    }

    /// Returns the article this tree belongs to.
    #[must_use]
    pub fn article_id(&self) -> &str {
        &self.article_id
    }

    /// Returns the threads in render order.
    #[must_use]
    pub fn threads(&self) -> &[CommentThread] {
        &self.threads
    }

    /// Returns the number of top-level comments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    /// Returns true if the tree has no comments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Returns the number of entries, replies included.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.threads.iter().map(|t| 1 + t.replies.len()).sum()
    }

    /// Returns the number of provisional entries.
    #[must_use]
    pub fn provisional_count(&self) -> usize {
        self.entries().filter(|e| e.is_provisional()).count()
    }

    /// Iterates every entry in render order.
    pub fn entries(&self) -> impl Iterator<Item = &CommentEntry> {
        self.threads
            .iter()
            .flat_map(|t| std::iter::once(&t.entry).chain(t.replies.iter()))
    }

    /// Returns true if an entry has this identifier.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.locate(id).is_some()
    }

    /// Finds an entry.
    #[must_use]
    pub fn locate(&self, id: &str) -> Option<Location> {
        for (thread, t) in self.threads.iter().enumerate() {
            if t.entry.id() == id {
                return Some(Location::Root(thread));
            }
            if let Some(index) = t.replies.iter().position(|r| r.id() == id) {
                return Some(Location::Reply { thread, index });
            }
        }
        None
    }

    /// Returns an entry.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CommentEntry> {
        match self.locate(id)? {
            Location::Root(thread) => self.threads.get(thread).map(|t| &t.entry),
            Location::Reply { thread, index } => {
                self.threads.get(thread).and_then(|t| t.replies.get(index))
            }
        }
    }

    /// Returns the thread holding an entry.
    #[must_use]
    pub fn thread(&self, id: &str) -> Option<&CommentThread> {
        let index = self.thread_index(id)?;
        self.threads.get(index)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut CommentEntry> {
        match self.locate(id)? {
            Location::Root(thread) => self.threads.get_mut(thread).map(|t| &mut t.entry),
            Location::Reply { thread, index } => self
                .threads
                .get_mut(thread)
                .and_then(|t| t.replies.get_mut(index)),
        }
    }

    /// Index of the thread an entry lives in. A reply resolves to its thread.
    fn thread_index(&self, id: &str) -> Option<usize> {
        match self.locate(id)? {
            Location::Root(thread) | Location::Reply { thread, .. } => Some(thread),
        }
    }

    fn check_article(&self, comment: &Comment) -> Result<(), TreeError> {
        if comment.article == self.article_id {
            Ok(())
        } else {
            Err(TreeError::ArticleMismatch {
                expected: self.article_id.clone(),
                found: comment.article.clone(),
            })
        }
    }

    /// Inserts an entry at the head of its list.
    ///
    /// Top-level comments go to the head of the root list, replies to the
    /// head of their thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is taken, the comment belongs to
    /// another article, or a reply's parent is missing.
    pub fn insert(&mut self, entry: CommentEntry) -> Result<Location, TreeError> {
        match entry.comment.parent_comment.clone() {
            Some(parent_id) => self.prepend_reply(&parent_id, entry),
            None => self.prepend_root(entry),
        }
    }

    /// Prepends a top-level comment.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is taken or the article differs.
    pub fn prepend_root(&mut self, mut entry: CommentEntry) -> Result<Location, TreeError> {
        self.check_article(&entry.comment)?;
        if self.contains(entry.id()) {
            return Err(TreeError::DuplicateId(entry.comment.id));
        }

        let nested = mem::take(&mut entry.comment.replies);
        self.threads.insert(
            0,
            CommentThread {
                entry,
                replies: Vec::new(),
            },
        );
        self.absorb_replies(0, nested);
        Ok(Location::Root(0))
    }

    /// Prepends a reply to the thread holding `parent_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is taken, the article differs or
    /// the parent is missing.
    pub fn prepend_reply(
        &mut self,
        parent_id: &str,
        mut entry: CommentEntry,
    ) -> Result<Location, TreeError> {
        self.check_article(&entry.comment)?;
        if self.contains(entry.id()) {
            return Err(TreeError::DuplicateId(entry.comment.id));
        }

        let thread = self
            .thread_index(parent_id)
            .ok_or_else(|| TreeError::ParentNotFound(parent_id.to_string()))?;

        entry.comment.replies.clear();
        if let Some(t) = self.threads.get_mut(thread) {
            t.replies.insert(0, entry);
        }
        Ok(Location::Reply { thread, index: 0 })
    }

    /// Replaces an entry with a confirmed comment, keeping its position.
    ///
    /// A replaced thread keeps its replies.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is missing or the confirmed identifier is
    /// already held by another entry.
    pub fn replace(&mut self, id: &str, mut confirmed: Comment) -> Result<Location, TreeError> {
        self.check_article(&confirmed)?;
        let location = self
            .locate(id)
            .ok_or_else(|| TreeError::NotFound(id.to_string()))?;
        if confirmed.id != id && self.contains(&confirmed.id) {
            return Err(TreeError::DuplicateId(confirmed.id));
        }

        let nested = mem::take(&mut confirmed.replies);
        match location {
            Location::Root(index) => {
                if let Some(t) = self.threads.get_mut(index) {
                    t.entry = CommentEntry::confirmed(confirmed);
                }
                self.absorb_replies(index, nested);
            }
            Location::Reply { thread, index } => {
                if let Some(slot) = self
                    .threads
                    .get_mut(thread)
                    .and_then(|t| t.replies.get_mut(index))
                {
                    *slot = CommentEntry::confirmed(confirmed);
                }
            }
        }
        Ok(location)
    }

    /// Removes an entry. Removing a thread removes its replies.
    pub fn remove(&mut self, id: &str) -> Option<CommentEntry> {
        match self.locate(id)? {
            Location::Root(index) => {
                if index < self.threads.len() {
                    Some(self.threads.remove(index).entry)
                } else {
                    None
                }
            }
            Location::Reply { thread, index } => {
                let t = self.threads.get_mut(thread)?;
                if index < t.replies.len() {
                    Some(t.replies.remove(index))
                } else {
                    None
                }
            }
        }
    }

    /// Overwrites an existing entry's comment in place and marks it confirmed.
    ///
    /// Returns false if the identifier is not in the tree.
    pub fn refresh(&mut self, mut comment: Comment) -> bool {
        let nested = mem::take(&mut comment.replies);
        let Some(entry) = self.get_mut(&comment.id) else {
            return false;
        };
        let id = comment.id.clone();
        *entry = CommentEntry::confirmed(comment);

        if let Some(Location::Root(index)) = self.locate(&id) {
            self.absorb_replies(index, nested);
        }
        true
    }

    /// Merges a listing page: known comments are refreshed, unseen ones are
    /// appended after the existing threads in page order.
    ///
    /// Returns the number of threads appended.
    pub fn merge_page(&mut self, comments: Vec<Comment>) -> usize {
        let mut appended = 0;
        for mut comment in comments {
            if comment.article != self.article_id || comment.parent_comment.is_some() {
                continue;
            }
            if self.contains(&comment.id) {
                self.refresh(comment);
                continue;
            }

            let nested = mem::take(&mut comment.replies);
            self.threads.push(CommentThread {
                entry: CommentEntry::confirmed(comment),
                replies: Vec::new(),
            });
            self.absorb_replies(self.threads.len() - 1, nested);
            appended += 1;
        }
        appended
    }

    /// Merges a fetched reply listing into the thread holding `parent_id`.
    ///
    /// Returns the number of replies appended.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::ParentNotFound`] if the parent is missing.
    pub fn merge_replies(
        &mut self,
        parent_id: &str,
        replies: Vec<Comment>,
    ) -> Result<usize, TreeError> {
        let index = self
            .thread_index(parent_id)
            .ok_or_else(|| TreeError::ParentNotFound(parent_id.to_string()))?;

        Ok(self.absorb_replies(index, replies))
    }

    /// Overwrites likers and like count on an entry.
    ///
    /// Returns false if the identifier is not in the tree.
    pub fn update_likes(&mut self, source: &Comment) -> bool {
        match self.get_mut(&source.id) {
            Some(entry) => {
                entry.comment.likes = source.likes.clone();
                entry.comment.like_count = source.like_count;
                true
            }
            None => false,
        }
    }

    /// Appends unseen replies to a thread, flattening nested replies.
    ///
    /// Returns the number appended.
    fn absorb_replies(&mut self, index: usize, replies: Vec<Comment>) -> usize {
        if replies.is_empty() {
            return 0;
        }

        let mut known: HashSet<String> = self.entries().map(|e| e.comment.id.clone()).collect();
        let article_id = self.article_id.clone();
        let Some(thread) = self.threads.get_mut(index) else {
            return 0;
        };

        let mut appended = 0;
        let mut queue = replies;
        while !queue.is_empty() {
            let mut next = Vec::new();
            for mut reply in queue {
                next.append(&mut reply.replies);
                if reply.article == article_id && known.insert(reply.id.clone()) {
                    thread.replies.push(CommentEntry::confirmed(reply));
                    appended += 1;
                }
            }
            queue = next;
        }
        appended
    }
}
