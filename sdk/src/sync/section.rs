//! Comment section view.
//!
//! A [`CommentSection`] owns the comment tree and pending mutations of one
//! rendered article. It leases the shared connection, joins the article
//! room for as long as it lives, and applies both channel events and CRUD
//! responses to its tree.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, info, warn};

use super::pending::{DispatchPath, MutationKind, PendingBuffer, PendingMutation};
use super::reconcile::{reconcile, ReconcileOutcome};
use super::tree::{CommentEntry, CommentTree};
use crate::client::CommentApi;
use crate::error::SyncError;
use crate::types::{Comment, CommentLikeResponse, CreateCommentRequest, UserIdentity};
use crate::ws::{
    CommentAdded, CommentError, ConnectionLease, ConnectionManager, NewComment, Transport,
    WsTransport,
};

/// Pagination position of a section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageInfo {
    /// Last loaded page (0 before the first load).
    pub current_page: u32,
    /// Total number of pages.
    pub total_pages: u32,
    /// Total number of top-level comments on the server.
    pub total_comments: u64,
}

impl PageInfo {
    /// Returns true if more pages can be loaded.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// How a submitted comment was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
    /// Emitted over the channel; confirmation arrives as an event.
    Dispatched {
        /// Synthetic ID of the provisional entry.
        synthetic_id: String,
    },
    /// Created through the CRUD collaborator and already confirmed.
    Confirmed {
        /// Server-assigned ID.
        id: String,
    },
}

/// A change applied to the section from the channel.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionUpdate {
    /// A confirmed comment was reconciled.
    Comment(ReconcileOutcome),
    /// The server rejected a comment sent over the channel.
    Rejected {
        /// Server error.
        error: CommentError,
        /// The rolled-back mutation, if one was pending.
        mutation: Option<PendingMutation>,
    },
}

enum Incoming {
    Comment(Result<CommentAdded, RecvError>),
    Error(Result<CommentError, RecvError>),
}

/// Live comment view for one article.
pub struct CommentSection<A: CommentApi, T: Transport = WsTransport> {
    article_id: String,
    api: Arc<A>,
    connection: ConnectionManager<T>,
    lease: Option<ConnectionLease<T>>,
    tree: CommentTree,
    pending: PendingBuffer,
    comments: broadcast::Receiver<CommentAdded>,
    errors: broadcast::Receiver<CommentError>,
    page: PageInfo,
    page_size: u32,
    pending_timeout: Duration,
    joined: bool,
}

impl<A: CommentApi, T: Transport> CommentSection<A, T> {
    /// Opens a section: leases the channel if signed in, joins the article
    /// room and loads the first page.
    ///
    /// # Errors
    ///
    /// Returns an error if the first page cannot be loaded.
    pub async fn open(
        article_id: impl Into<String>,
        api: Arc<A>,
        connection: ConnectionManager<T>,
        page_size: u32,
    ) -> Result<Self, SyncError> {
        let article_id = article_id.into();

        // Subscribe before joining so no event for this room is missed.
        let comments = connection.router().subscribe_comments();
        let errors = connection.router().subscribe_comment_errors();

        let lease = match connection.session().token() {
            Some(token) => match connection.lease(&token) {
                Ok(lease) => Some(lease),
                Err(err) => {
                    warn!(article = %article_id, error = %err, "channel unavailable, using requests only");
                    None
                }
            },
            None => None,
        };
        connection.join_article_room(&article_id);

        let pending_timeout = connection.config().pending_timeout;
        let mut section = Self {
            tree: CommentTree::new(article_id.clone()),
            article_id,
            api,
            connection,
            lease,
            pending: PendingBuffer::new(),
            comments,
            errors,
            page: PageInfo::default(),
            page_size: page_size.max(1),
            pending_timeout,
            joined: true,
        };

        section.load_page(1).await?;
        info!(article = %section.article_id, comments = section.tree.len(), "comment section opened");
        Ok(section)
    }

    /// Returns the article ID.
    #[must_use]
    pub fn article_id(&self) -> &str {
        &self.article_id
    }

    /// Returns the comment tree.
    #[must_use]
    pub fn tree(&self) -> &CommentTree {
        &self.tree
    }

    /// Returns the pending mutations.
    #[must_use]
    pub fn pending(&self) -> &PendingBuffer {
        &self.pending
    }

    /// Returns the pagination position.
    #[must_use]
    pub fn page(&self) -> PageInfo {
        self.page
    }

    /// Returns the shared connection.
    #[must_use]
    pub fn connection(&self) -> &ConnectionManager<T> {
        &self.connection
    }

    /// Returns true if this section holds a channel lease.
    #[must_use]
    pub fn is_leased(&self) -> bool {
        self.lease.is_some()
    }

    /// Loads a page of top-level comments and merges it into the tree.
    ///
    /// Comments already delivered live are refreshed rather than duplicated.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn load_page(&mut self, page: u32) -> Result<PageInfo, SyncError> {
        let listing = self
            .api
            .list_by_article(&self.article_id, page, self.page_size)
            .await?;

        self.page = PageInfo {
            current_page: listing.current_page,
            total_pages: listing.total_pages,
            total_comments: listing.total_comments,
        };
        let appended = self.tree.merge_page(listing.comments);
        debug!(
            article = %self.article_id,
            page = self.page.current_page,
            total_pages = self.page.total_pages,
            appended,
            "comment page loaded"
        );
        Ok(self.page)
    }

    /// Loads the next page, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn load_more(&mut self) -> Result<Option<PageInfo>, SyncError> {
        if !self.page.has_more() {
            return Ok(None);
        }
        self.load_page(self.page.current_page + 1).await.map(Some)
    }

    /// Fetches the replies of a comment into its thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the comment is not loaded.
    pub async fn load_replies(&mut self, comment_id: &str) -> Result<usize, SyncError> {
        let listing = self
            .api
            .list_replies(comment_id, 1, self.page_size)
            .await?;
        let appended = self.tree.merge_replies(comment_id, listing.comments)?;
        debug!(article = %self.article_id, comment = comment_id, appended, "replies loaded");
        Ok(appended)
    }

    /// Posts a top-level comment.
    ///
    /// # Errors
    ///
    /// See [`CommentSection::submit_reply`].
    pub async fn submit_comment(&mut self, content: &str) -> Result<Submitted, SyncError> {
        self.submit(content, None).await
    }

    /// Posts a reply to `parent_id`.
    ///
    /// The provisional entry is visible before this returns. While the
    /// channel is connected the comment is emitted and confirmed later by
    /// its echo; otherwise it is created through the CRUD collaborator and
    /// the response replaces the provisional entry.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotAuthenticated`] without a signed-in user,
    /// [`SyncError::EmptyContent`] for blank content, a tree error if the
    /// parent is not loaded, or the request error after rolling back.
    pub async fn submit_reply(
        &mut self,
        parent_id: &str,
        content: &str,
    ) -> Result<Submitted, SyncError> {
        self.submit(content, Some(parent_id.to_string())).await
    }

    async fn submit(
        &mut self,
        content: &str,
        parent_id: Option<String>,
    ) -> Result<Submitted, SyncError> {
        let user = self.current_user()?;
        if content.trim().is_empty() {
            return Err(SyncError::EmptyContent);
        }

        let now = Utc::now();
        let kind = match &parent_id {
            Some(parent) => MutationKind::Reply {
                parent_id: parent.clone(),
            },
            None => MutationKind::Comment,
        };
        let path = if self.connection.is_connected() {
            DispatchPath::Channel
        } else {
            DispatchPath::Request
        };

        let synthetic_id = self
            .pending
            .begin(kind, &self.article_id, &user.id, content, path, now);
        let provisional = Comment::provisional(
            synthetic_id.clone(),
            self.article_id.clone(),
            user.as_author(),
            content,
            parent_id.clone(),
            now,
        );
        if let Err(err) = self.tree.insert(CommentEntry::provisional(provisional)) {
            self.pending.fail(&synthetic_id, err.to_string());
            return Err(err.into());
        }

        if path == DispatchPath::Channel {
            let frame = NewComment {
                article_id: self.article_id.clone(),
                content: content.to_string(),
                parent_comment_id: parent_id.clone(),
            };
            match self.connection.emit_new_comment(frame) {
                Ok(()) => {
                    debug!(article = %self.article_id, synthetic = %synthetic_id, "comment emitted");
                    return Ok(Submitted::Dispatched { synthetic_id });
                }
                Err(err) => {
                    warn!(article = %self.article_id, error = %err, "emit failed, falling back to request");
                    self.pending.set_path(&synthetic_id, DispatchPath::Request);
                }
            }
        }

        let request = CreateCommentRequest {
            article_id: self.article_id.clone(),
            content: content.to_string(),
            parent_comment_id: parent_id,
        };
        self.create_by_request(synthetic_id, &request).await
    }

    async fn create_by_request(
        &mut self,
        synthetic_id: String,
        request: &CreateCommentRequest,
    ) -> Result<Submitted, SyncError> {
        let metrics = Arc::clone(self.connection.metrics());

        match self.api.create(request).await {
            Ok(comment) => {
                let id = comment.id.clone();
                self.pending.confirm(&synthetic_id, &id);

                if self.tree.contains(&id) {
                    // The broadcast for this comment was reconciled first.
                    self.tree.remove(&synthetic_id);
                    self.tree.refresh(comment);
                    metrics.record_duplicate();
                } else if self.tree.replace(&synthetic_id, comment.clone()).is_ok() {
                    metrics.record_replaced();
                } else if self.tree.insert(CommentEntry::confirmed(comment)).is_ok() {
                    metrics.record_inserted();
                }

                debug!(article = %self.article_id, synthetic = %synthetic_id, id = %id, "comment confirmed by request");
                Ok(Submitted::Confirmed { id })
            }
            Err(err) => {
                self.tree.remove(&synthetic_id);
                self.pending.fail(&synthetic_id, err.to_string());
                metrics.record_mutation_failed();
                warn!(article = %self.article_id, synthetic = %synthetic_id, error = %err, "comment rolled back");
                Err(err.into())
            }
        }
    }

    /// Reconciles a `comment_added` event into the tree.
    pub fn handle_comment_added(&mut self, event: CommentAdded) -> ReconcileOutcome {
        let outcome = reconcile(&mut self.pending, &mut self.tree, event.comment);
        let metrics = self.connection.metrics();

        match &outcome {
            ReconcileOutcome::Replaced { synthetic_id, id } => {
                metrics.record_replaced();
                debug!(article = %self.article_id, synthetic = %synthetic_id, id = %id, "provisional comment confirmed");
            }
            ReconcileOutcome::Inserted { id } => {
                metrics.record_inserted();
                debug!(article = %self.article_id, id = %id, "comment inserted");
            }
            ReconcileOutcome::Refreshed { id } => {
                metrics.record_duplicate();
                debug!(article = %self.article_id, id = %id, "duplicate comment refreshed");
            }
            ReconcileOutcome::Ignored(reason) => {
                debug!(article = %self.article_id, ?reason, "comment ignored");
            }
        }
        outcome
    }

    /// Rolls back the oldest comment sent over the channel for this article.
    ///
    /// Returns None for errors about other articles. Errors that name no
    /// article are not attributable to one section; the affected mutation
    /// is left to [`CommentSection::expire_pending`].
    pub fn handle_comment_error(&mut self, error: CommentError) -> Option<SectionUpdate> {
        match error.article_id.as_deref() {
            Some(article) if article == self.article_id => {}
            Some(_) => return None,
            None => {
                debug!(article = %self.article_id, reason = %error.message, "unattributed comment error ignored");
                return None;
            }
        }

        let synthetic_id = self
            .pending
            .oldest_on_channel(&self.article_id)
            .map(|m| m.synthetic_id.clone());
        let mutation = synthetic_id.and_then(|id| {
            self.tree.remove(&id);
            self.pending.fail(&id, error.message.clone())
        });

        if mutation.is_some() {
            self.connection.metrics().record_mutation_failed();
        }
        warn!(
            article = %self.article_id,
            reason = %error.message,
            rolled_back = mutation.is_some(),
            "comment rejected by server"
        );
        Some(SectionUpdate::Rejected { error, mutation })
    }

    /// Applies every channel event already queued for this section.
    pub fn pump_events(&mut self) -> Vec<SectionUpdate> {
        let mut updates = Vec::new();

        loop {
            match self.comments.try_recv() {
                Ok(event) => updates.push(SectionUpdate::Comment(self.handle_comment_added(event))),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(article = %self.article_id, skipped, "comment stream lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        loop {
            match self.errors.try_recv() {
                Ok(error) => updates.extend(self.handle_comment_error(error)),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(article = %self.article_id, skipped, "comment error stream lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        updates
    }

    /// Waits for the next channel event relevant to this section and
    /// applies it.
    ///
    /// Returns None once the event streams are closed.
    pub async fn next_update(&mut self) -> Option<SectionUpdate> {
        loop {
            let incoming = tokio::select! {
                received = self.comments.recv() => Incoming::Comment(received),
                received = self.errors.recv() => Incoming::Error(received),
            };

            match incoming {
                Incoming::Comment(Ok(event)) => {
                    return Some(SectionUpdate::Comment(self.handle_comment_added(event)));
                }
                Incoming::Error(Ok(error)) => {
                    if let Some(update) = self.handle_comment_error(error) {
                        return Some(update);
                    }
                }
                Incoming::Comment(Err(RecvError::Lagged(skipped)))
                | Incoming::Error(Err(RecvError::Lagged(skipped))) => {
                    warn!(article = %self.article_id, skipped, "event stream lagged");
                }
                Incoming::Comment(Err(RecvError::Closed))
                | Incoming::Error(Err(RecvError::Closed)) => return None,
            }
        }
    }

    /// Toggles the current user's like on a comment.
    ///
    /// Likers and count are overwritten from the response; nothing is
    /// changed before it arrives.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::LikeInFlight`] if a toggle for this comment has
    /// not completed, or the request error.
    pub async fn toggle_comment_like(
        &mut self,
        comment_id: &str,
    ) -> Result<CommentLikeResponse, SyncError> {
        let user = self.current_user()?;
        let synthetic_id = self
            .pending
            .begin_like(comment_id, &self.article_id, &user.id, Utc::now())
            .ok_or_else(|| SyncError::LikeInFlight(comment_id.to_string()))?;

        match self.api.toggle_like(comment_id).await {
            Ok(response) => {
                self.pending.confirm(&synthetic_id, comment_id);
                self.tree.update_likes(&response.comment);
                debug!(comment = comment_id, liked = response.user_liked, "comment like toggled");
                Ok(response)
            }
            Err(err) => {
                self.pending.fail(&synthetic_id, err.to_string());
                self.connection.metrics().record_mutation_failed();
                warn!(comment = comment_id, error = %err, "comment like failed");
                Err(err.into())
            }
        }
    }

    /// Edits a comment and applies the response to the tree.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::EmptyContent`] for blank content or the request
    /// error.
    pub async fn edit_comment(
        &mut self,
        comment_id: &str,
        content: &str,
    ) -> Result<Comment, SyncError> {
        if content.trim().is_empty() {
            return Err(SyncError::EmptyContent);
        }

        let updated = self.api.update(comment_id, content).await?;
        self.tree.refresh(updated.clone());
        debug!(comment = comment_id, "comment edited");
        Ok(updated)
    }

    /// Deletes a comment and removes it from the tree.
    ///
    /// Returns true if the comment was loaded in this view.
    ///
    /// # Errors
    ///
    /// Returns the request error; the tree is unchanged in that case.
    pub async fn delete_comment(&mut self, comment_id: &str) -> Result<bool, SyncError> {
        self.api.delete(comment_id).await?;
        let removed = self.tree.remove(comment_id).is_some();
        debug!(comment = comment_id, removed, "comment deleted");
        Ok(removed)
    }

    /// Rolls back mutations unconfirmed for longer than the pending timeout.
    pub fn expire_pending(&mut self, now: DateTime<Utc>) -> Vec<PendingMutation> {
        let expired = self.pending.expired(now, self.pending_timeout);
        let mut failed = Vec::with_capacity(expired.len());

        for synthetic_id in expired {
            self.tree.remove(&synthetic_id);
            if let Some(mutation) = self.pending.fail(&synthetic_id, "confirmation timed out") {
                self.connection.metrics().record_mutation_failed();
                warn!(article = %self.article_id, synthetic = %synthetic_id, "pending mutation expired");
                failed.push(mutation);
            }
        }
        failed
    }

    /// Leaves the article room and releases the channel lease.
    pub fn close(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if !self.joined {
            return;
        }
        self.joined = false;
        self.connection.leave_article_room(&self.article_id);
        self.lease = None;
        info!(article = %self.article_id, "comment section closed");
    }

    fn current_user(&self) -> Result<UserIdentity, SyncError> {
        self.connection
            .session()
            .current_user()
            .ok_or(SyncError::NotAuthenticated)
    }
}

impl<A: CommentApi, T: Transport> Drop for CommentSection<A, T> {
    fn drop(&mut self) {
        self.detach();
    }
}
