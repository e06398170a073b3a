//! Core types for the Blogsync SDK.
//!
//! Comments, article like counters, notifications, push subscriptions and
//! the signed-in user.

pub mod article;
pub mod comment;
pub mod notification;
pub mod push;
pub mod user;

pub use article::{ArticleLikeResponse, ArticleLikeState};
pub use comment::{
    Comment, CommentAuthor, CommentKind, CommentLikeResponse, CommentPage, CreateCommentRequest,
};
pub use notification::{Notification, NotificationEvent, NotificationKind};
pub use push::{PushKeys, PushSubscription};
pub use user::UserIdentity;
