//! Collaborator contracts consumed by the synchronization engine.
//!
//! The engine never talks HTTP directly; it calls these traits so views can
//! be driven by an in-memory implementation in tests.

use std::future::Future;

use super::error::ClientError;
use crate::types::{
    ArticleLikeResponse, Comment, CommentLikeResponse, CommentPage, CreateCommentRequest,
    PushSubscription,
};

/// Comment CRUD collaborator.
pub trait CommentApi: Send + Sync {
    /// Lists one page of top-level comments for an article.
    fn list_by_article(
        &self,
        article_id: &str,
        page: u32,
        limit: u32,
    ) -> impl Future<Output = Result<CommentPage, ClientError>> + Send;

    /// Creates a comment or reply.
    fn create(
        &self,
        request: &CreateCommentRequest,
    ) -> impl Future<Output = Result<Comment, ClientError>> + Send;

    /// Updates a comment's body.
    fn update(
        &self,
        comment_id: &str,
        content: &str,
    ) -> impl Future<Output = Result<Comment, ClientError>> + Send;

    /// Deletes a comment.
    fn delete(&self, comment_id: &str) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Toggles the caller's like on a comment.
    fn toggle_like(
        &self,
        comment_id: &str,
    ) -> impl Future<Output = Result<CommentLikeResponse, ClientError>> + Send;

    /// Lists one page of replies to a comment.
    fn list_replies(
        &self,
        comment_id: &str,
        page: u32,
        limit: u32,
    ) -> impl Future<Output = Result<CommentPage, ClientError>> + Send;
}

/// Article like collaborator.
pub trait ArticleApi: Send + Sync {
    /// Toggles the caller's like on an article.
    fn toggle_article_like(
        &self,
        article_id: &str,
    ) -> impl Future<Output = Result<ArticleLikeResponse, ClientError>> + Send;
}

/// Server side of push registration.
pub trait PushRegistrar: Send + Sync {
    /// Fetches the server's VAPID public key.
    fn vapid_public_key(&self) -> impl Future<Output = Result<String, ClientError>> + Send;

    /// Stores a subscription for the signed-in user.
    fn register(
        &self,
        subscription: &PushSubscription,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;
}
