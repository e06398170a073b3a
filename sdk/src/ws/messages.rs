//! Channel message types.
//!
//! Every frame is a JSON envelope `{"event": <name>, "data": <payload>}`.
//! Inbound frames are decoded once, here, into [`InboundEvent`]; nothing
//! downstream looks at event names.

use serde::{Deserialize, Serialize};

use super::error::WsError;
use crate::types::{Comment, NotificationEvent};

/// Client-to-server messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join an article room.
    JoinArticle(String),
    /// Leave an article room.
    LeaveArticle(String),
    /// Create a comment or reply.
    NewComment(NewComment),
    /// Heartbeat.
    Ping {
        /// Timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Payload of an outbound `new_comment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    /// Article ID.
    pub article_id: String,
    /// Body text.
    pub content: String,
    /// Parent comment ID for replies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<String>,
}

impl ClientMessage {
    /// Creates a heartbeat stamped with the current time.
    #[must_use]
    pub fn ping_now() -> Self {
        Self::Ping {
            timestamp: u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0),
        }
    }

    /// Serializes the message to its wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_frame(&self) -> Result<String, WsError> {
        serde_json::to_string(self).map_err(|e| WsError::Serialization(e.to_string()))
    }
}

/// Structural kind carried by a `comment_added` event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentEventKind {
    /// Top-level comment.
    #[default]
    Comment,
    /// Reply.
    Reply,
}

/// A comment confirmed by the server and broadcast to the article room.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommentAdded {
    /// The confirmed comment.
    pub comment: Comment,
    /// Whether it is a comment or a reply.
    #[serde(rename = "type", default)]
    pub kind: CommentEventKind,
}

/// A like-count change on an article.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleLiked {
    /// Article ID.
    pub article_id: String,
    /// Authoritative like total.
    pub like_count: u64,
    /// User who toggled, if disclosed.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Whether that user now likes the article.
    #[serde(default)]
    pub user_liked: Option<bool>,
}

/// A rejected `new_comment`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentError {
    /// Server message.
    pub message: String,
    /// Article the failed comment targeted, if disclosed.
    #[serde(default)]
    pub article_id: Option<String>,
}

/// A connect-time rejection pushed over an open socket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectError {
    /// Server-provided reason.
    pub message: String,
}

/// Server-to-client events.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// A comment or reply was added.
    CommentAdded(CommentAdded),
    /// An article like counter changed.
    ArticleLiked(ArticleLiked),
    /// Generic notification.
    Notification(NotificationEvent),
    /// A comment submission failed.
    CommentError(CommentError),
    /// The server rejected the connection.
    ConnectError(ConnectError),
    /// Heartbeat reply.
    Pong {
        /// Echoed timestamp in milliseconds.
        timestamp: u64,
    },
}

/// Routable event categories, one stream each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    /// `comment_added`.
    CommentAdded,
    /// `article_liked`.
    ArticleLiked,
    /// `notification`.
    Notification,
    /// `comment_error`.
    CommentError,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CommentAdded => write!(f, "comment_added"),
            Self::ArticleLiked => write!(f, "article_liked"),
            Self::Notification => write!(f, "notification"),
            Self::CommentError => write!(f, "comment_error"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct Pong {
    #[serde(default)]
    timestamp: u64,
}

impl InboundEvent {
    /// Decodes an inbound frame.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::Deserialization`] for malformed frames and
    /// [`WsError::UnknownEvent`] for event names this client does not handle.
    pub fn decode(frame: &str) -> Result<Self, WsError> {
        let envelope: Envelope =
            serde_json::from_str(frame).map_err(|e| WsError::Deserialization(e.to_string()))?;

        let event = match envelope.event.as_str() {
            "comment_added" => Self::CommentAdded(payload(envelope.data)?),
            "article_liked" => Self::ArticleLiked(payload(envelope.data)?),
            "notification" => Self::Notification(payload(envelope.data)?),
            "comment_error" => Self::CommentError(payload(envelope.data)?),
            "connect_error" => Self::ConnectError(payload(envelope.data)?),
            "pong" => {
                let pong: Pong = payload(envelope.data)?;
                Self::Pong {
                    timestamp: pong.timestamp,
                }
            }
            _ => return Err(WsError::UnknownEvent(envelope.event)),
        };

        Ok(event)
    }

    /// Returns the stream this event is routed to, or None for lifecycle events.
    #[must_use]
    pub fn category(&self) -> Option<EventCategory> {
        match self {
            Self::CommentAdded(_) => Some(EventCategory::CommentAdded),
            Self::ArticleLiked(_) => Some(EventCategory::ArticleLiked),
            Self::Notification(_) => Some(EventCategory::Notification),
            Self::CommentError(_) => Some(EventCategory::CommentError),
            Self::ConnectError(_) | Self::Pong { .. } => None,
        }
    }
}

fn payload<T: serde::de::DeserializeOwned>(data: serde_json::Value) -> Result<T, WsError> {
    serde_json::from_value(data).map_err(|e| WsError::Deserialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_join_serialize() {
        let msg = ClientMessage::JoinArticle("a1".to_string());
        let json = msg.to_frame().expect("serialize");
        assert_eq!(json, r#"{"event":"join_article","data":"a1"}"#);
    }

    #[test]
    fn test_client_message_new_comment_serialize() {
        let msg = ClientMessage::NewComment(NewComment {
            article_id: "a1".to_string(),
            content: "hi".to_string(),
            parent_comment_id: Some("c1".to_string()),
        });
        let json = msg.to_frame().expect("serialize");
        assert!(json.contains("\"event\":\"new_comment\""));
        assert!(json.contains("\"articleId\":\"a1\""));
        assert!(json.contains("\"parentCommentId\":\"c1\""));
    }

    #[test]
    fn test_client_message_ping_serialize() {
        let msg = ClientMessage::Ping {
            timestamp: 1706640000000,
        };
        let json = msg.to_frame().expect("serialize");
        assert_eq!(json, r#"{"event":"ping","data":{"timestamp":1706640000000}}"#);
    }

    #[test]
    fn test_decode_comment_added() {
        let frame = r#"{"event":"comment_added","data":{"type":"reply","comment":{"_id":"r1","article":"a1","author":{"_id":"u1","username":"alice"},"content":"hi","parentComment":"c1"}}}"#;
        match InboundEvent::decode(frame).expect("decode") {
            InboundEvent::CommentAdded(added) => {
                assert_eq!(added.kind, CommentEventKind::Reply);
                assert_eq!(added.comment.id, "r1");
                assert_eq!(added.comment.parent_comment.as_deref(), Some("c1"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_article_liked() {
        let frame = r#"{"event":"article_liked","data":{"articleId":"a1","likeCount":6,"userId":"u1","userLiked":true}}"#;
        let event = InboundEvent::decode(frame).expect("decode");
        assert_eq!(event.category(), Some(EventCategory::ArticleLiked));
        match event {
            InboundEvent::ArticleLiked(liked) => {
                assert_eq!(liked.like_count, 6);
                assert_eq!(liked.user_liked, Some(true));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_connect_error_is_lifecycle() {
        let frame = r#"{"event":"connect_error","data":{"message":"Authentication error"}}"#;
        let event = InboundEvent::decode(frame).expect("decode");
        assert!(event.category().is_none());
    }

    #[test]
    fn test_decode_unknown_event() {
        let frame = r#"{"event":"user_typing","data":{}}"#;
        assert_eq!(
            InboundEvent::decode(frame),
            Err(WsError::UnknownEvent("user_typing".to_string()))
        );
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(
            InboundEvent::decode("not json"),
            Err(WsError::Deserialization(_))
        ));
        assert!(matches!(
            InboundEvent::decode(r#"{"event":"comment_added","data":{"comment":42}}"#),
            Err(WsError::Deserialization(_))
        ));
    }

    #[test]
    fn test_event_category_display() {
        assert_eq!(EventCategory::CommentAdded.to_string(), "comment_added");
        assert_eq!(EventCategory::CommentError.to_string(), "comment_error");
    }
}
