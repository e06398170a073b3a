//! Comment types for the Blogsync SDK.
//!
//! Wire shapes follow the comment API: identifiers travel as `_id` and the
//! remaining fields are camelCase.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author reference embedded in a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAuthor {
    /// User ID.
    #[serde(rename = "_id")]
    pub id: String,

    /// Display name.
    pub username: String,

    /// Email address.
    #[serde(default)]
    pub email: String,
}

/// A comment or reply on an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Comment ID (server-assigned, or synthetic while provisional).
    #[serde(rename = "_id")]
    pub id: String,

    /// Owning article ID.
    pub article: String,

    /// Author reference.
    pub author: CommentAuthor,

    /// Author name denormalized by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,

    /// Body text.
    pub content: String,

    /// Parent comment ID (None for top-level comments).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_comment: Option<String>,

    /// Replies, most recent first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<Comment>,

    /// IDs of users who liked the comment.
    #[serde(default)]
    pub likes: BTreeSet<String>,

    /// Whether the comment was edited.
    #[serde(default)]
    pub is_edited: bool,

    /// When the comment was last edited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,

    /// Whether the comment was deleted.
    #[serde(default)]
    pub is_deleted: bool,

    /// Creation time.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Last update time.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,

    /// Cached reply count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_count: Option<u32>,

    /// Cached like count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u32>,
}

impl Comment {
    /// Builds a provisional comment authored locally.
    #[must_use]
    pub fn provisional(
        id: impl Into<String>,
        article: impl Into<String>,
        author: CommentAuthor,
        content: impl Into<String>,
        parent_comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            article: article.into(),
            author_name: Some(author.username.clone()),
            author,
            content: content.into(),
            parent_comment,
            replies: Vec::new(),
            likes: BTreeSet::new(),
            is_edited: false,
            edited_at: None,
            is_deleted: false,
            created_at: now,
            updated_at: now,
            reply_count: None,
            like_count: None,
        }
    }

    /// Returns true if this comment is a reply.
    #[must_use]
    pub fn is_reply(&self) -> bool {
        self.parent_comment.is_some()
    }

    /// Returns the structural kind of this comment.
    #[must_use]
    pub fn kind(&self) -> CommentKind {
        match &self.parent_comment {
            Some(parent) => CommentKind::Reply {
                parent_id: parent.clone(),
            },
            None => CommentKind::TopLevel,
        }
    }

    /// Returns true if the given user liked this comment.
    #[must_use]
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.contains(user_id)
    }

    /// Returns the like total, preferring the server's cached count.
    #[must_use]
    pub fn like_total(&self) -> u32 {
        self.like_count
            .unwrap_or_else(|| u32::try_from(self.likes.len()).unwrap_or(u32::MAX))
    }

    /// Returns the display name for the author.
    #[must_use]
    pub fn display_author(&self) -> &str {
        self.author_name.as_deref().unwrap_or(&self.author.username)
    }
}

/// Structural kind of a comment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommentKind {
    /// Top-level comment on the article.
    TopLevel,
    /// Reply to another comment.
    Reply {
        /// Parent comment ID.
        parent_id: String,
    },
}

impl CommentKind {
    /// Returns the parent ID for replies.
    #[must_use]
    pub fn parent_id(&self) -> Option<&str> {
        match self {
            Self::TopLevel => None,
            Self::Reply { parent_id } => Some(parent_id),
        }
    }
}

/// A page of comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    /// Comments on this page.
    pub comments: Vec<Comment>,

    /// Page number (1-based).
    pub current_page: u32,

    /// Total number of pages.
    pub total_pages: u32,

    /// Total number of comments.
    pub total_comments: u64,
}

impl CommentPage {
    /// Returns true if more pages follow this one.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// Request body for creating a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    /// Article ID.
    pub article_id: String,

    /// Body text.
    pub content: String,

    /// Parent comment ID for replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<String>,
}

/// Response to a comment like toggle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentLikeResponse {
    /// Server message.
    #[serde(default)]
    pub message: String,

    /// Updated comment.
    pub comment: Comment,

    /// Whether the current user now likes the comment.
    pub user_liked: bool,
}
