//! Notification types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A new comment on one of the user's articles.
    NewComment,
    /// A reply to one of the user's comments.
    CommentReply,
    /// Free-form notification.
    Custom,
    /// Any category this client does not know about.
    #[serde(other)]
    Other,
}

/// A notification as pushed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    /// Category.
    #[serde(rename = "type")]
    pub kind: NotificationKind,

    /// Title line.
    pub title: String,

    /// Body text.
    pub message: String,

    /// Optional structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// When the server created the notification.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// A received notification with client-side presentation state.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Client-assigned ID, unique within a feed.
    pub id: u64,

    /// Whether the user has read it.
    pub read: bool,

    /// The notification as received.
    pub event: NotificationEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_deserialize() {
        let json = r#"{"type":"comment_reply","title":"New reply","message":"bob replied","data":{"articleId":"a1"}}"#;
        let event: NotificationEvent = serde_json::from_str(json).expect("deserialize");
        assert_eq!(event.kind, NotificationKind::CommentReply);
        assert_eq!(event.title, "New reply");
        assert!(event.data.is_some());
    }

    #[test]
    fn test_notification_unknown_kind() {
        let json = r#"{"type":"article_published","title":"t","message":"m"}"#;
        let event: NotificationEvent = serde_json::from_str(json).expect("deserialize");
        assert_eq!(event.kind, NotificationKind::Other);
    }
}
