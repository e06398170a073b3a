//! Inbound event routing.
//!
//! Demultiplexes decoded events into one broadcast stream per category.
//! Every subscriber sees events in channel arrival order; a subscriber that
//! falls more than the stream capacity behind loses the oldest events and is
//! told so by `RecvError::Lagged`.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use super::error::WsError;
use super::messages::{ArticleLiked, CommentAdded, CommentError, EventCategory, InboundEvent};
use super::metrics::SyncMetrics;
use crate::types::NotificationEvent;

/// Typed event streams shared by every view.
#[derive(Debug, Clone)]
pub struct EventRouter {
    comments: broadcast::Sender<CommentAdded>,
    likes: broadcast::Sender<ArticleLiked>,
    notifications: broadcast::Sender<NotificationEvent>,
    comment_errors: broadcast::Sender<CommentError>,
    metrics: Arc<SyncMetrics>,
}

impl EventRouter {
    /// Creates a router whose streams buffer `capacity` events each.
    #[must_use]
    pub fn new(capacity: usize, metrics: Arc<SyncMetrics>) -> Self {
        let capacity = capacity.max(1);
        let (comments, _) = broadcast::channel(capacity);
        let (likes, _) = broadcast::channel(capacity);
        let (notifications, _) = broadcast::channel(capacity);
        let (comment_errors, _) = broadcast::channel(capacity);

        Self {
            comments,
            likes,
            notifications,
            comment_errors,
            metrics,
        }
    }

    /// Subscribes to `comment_added` events.
    #[must_use]
    pub fn subscribe_comments(&self) -> broadcast::Receiver<CommentAdded> {
        self.comments.subscribe()
    }

    /// Subscribes to `article_liked` events.
    #[must_use]
    pub fn subscribe_article_likes(&self) -> broadcast::Receiver<ArticleLiked> {
        self.likes.subscribe()
    }

    /// Subscribes to notifications.
    #[must_use]
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<NotificationEvent> {
        self.notifications.subscribe()
    }

    /// Subscribes to `comment_error` events.
    #[must_use]
    pub fn subscribe_comment_errors(&self) -> broadcast::Receiver<CommentError> {
        self.comment_errors.subscribe()
    }

    /// Returns the notification stream as a `Stream`.
    #[must_use]
    pub fn notification_stream(&self) -> BroadcastStream<NotificationEvent> {
        BroadcastStream::new(self.notifications.subscribe())
    }

    /// Decodes a raw frame and routes it.
    ///
    /// Malformed frames, unknown events and lifecycle events are dropped
    /// with a diagnostic and reported as errors; the router never panics on
    /// input.
    ///
    /// # Errors
    ///
    /// Returns the decode error, or [`WsError::UnknownEvent`] for lifecycle
    /// events that have no stream.
    pub fn dispatch(&self, frame: &str) -> Result<EventCategory, WsError> {
        match InboundEvent::decode(frame) {
            Ok(event) => self.route(event),
            Err(err) => {
                self.drop_frame(&err);
                Err(err)
            }
        }
    }

    /// Routes a decoded event to exactly one stream.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::UnknownEvent`] if the event has no stream.
    pub fn route(&self, event: InboundEvent) -> Result<EventCategory, WsError> {
        let (category, delivered) = match event {
            InboundEvent::CommentAdded(added) => {
                debug!(
                    article = %added.comment.article,
                    comment = %added.comment.id,
                    "routing comment_added"
                );
                (EventCategory::CommentAdded, self.comments.send(added).is_ok())
            }
            InboundEvent::ArticleLiked(liked) => {
                debug!(article = %liked.article_id, likes = liked.like_count, "routing article_liked");
                (EventCategory::ArticleLiked, self.likes.send(liked).is_ok())
            }
            InboundEvent::Notification(notification) => {
                debug!(title = %notification.title, "routing notification");
                (
                    EventCategory::Notification,
                    self.notifications.send(notification).is_ok(),
                )
            }
            InboundEvent::CommentError(error) => {
                warn!(message = %error.message, "comment rejected by server");
                (
                    EventCategory::CommentError,
                    self.comment_errors.send(error).is_ok(),
                )
            }
            InboundEvent::ConnectError(_) => {
                let err = WsError::UnknownEvent("connect_error".to_string());
                self.drop_frame(&err);
                return Err(err);
            }
            InboundEvent::Pong { .. } => {
                let err = WsError::UnknownEvent("pong".to_string());
                self.drop_frame(&err);
                return Err(err);
            }
        };

        self.metrics.record_routed(category);
        if !delivered {
            debug!(%category, "no subscribers for event");
        }
        Ok(category)
    }

    fn drop_frame(&self, err: &WsError) {
        self.metrics.record_dropped();
        warn!("dropping inbound frame: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> EventRouter {
        EventRouter::new(16, Arc::new(SyncMetrics::new()))
    }

    const COMMENT_FRAME: &str = r#"{"event":"comment_added","data":{"type":"comment","comment":{"_id":"c1","article":"a1","author":{"_id":"u1","username":"alice"},"content":"hello"}}}"#;

    #[tokio::test]
    async fn test_route_to_every_subscriber_in_order() {
        let router = router();
        let mut section = router.subscribe_comments();
        let mut bell = router.subscribe_comments();

        assert_eq!(
            router.dispatch(COMMENT_FRAME),
            Ok(EventCategory::CommentAdded)
        );
        let second = COMMENT_FRAME.replace("\"c1\"", "\"c2\"");
        router.dispatch(&second).expect("route");

        for rx in [&mut section, &mut bell] {
            assert_eq!(rx.recv().await.expect("first").comment.id, "c1");
            assert_eq!(rx.recv().await.expect("second").comment.id, "c2");
        }
    }

    #[tokio::test]
    async fn test_route_exactly_one_stream() {
        let router = router();
        let mut comments = router.subscribe_comments();
        let mut likes = router.subscribe_article_likes();

        router
            .dispatch(r#"{"event":"article_liked","data":{"articleId":"a1","likeCount":3}}"#)
            .expect("route");

        assert_eq!(likes.recv().await.expect("like").like_count, 3);
        assert!(comments.try_recv().is_err());
    }

    #[test]
    fn test_route_without_subscribers_is_not_an_error() {
        let router = router();
        assert_eq!(
            router.dispatch(COMMENT_FRAME),
            Ok(EventCategory::CommentAdded)
        );
        assert_eq!(router.metrics.routed(EventCategory::CommentAdded), 1);
    }

    #[test]
    fn test_unknown_and_malformed_frames_dropped() {
        let router = router();
        assert!(router.dispatch(r#"{"event":"typing","data":{}}"#).is_err());
        assert!(router.dispatch("{").is_err());
        assert!(router
            .dispatch(r#"{"event":"pong","data":{"timestamp":1}}"#)
            .is_err());
        assert_eq!(router.metrics.events_dropped(), 3);
    }

    #[tokio::test]
    async fn test_comment_error_stream() {
        let router = router();
        let mut errors = router.subscribe_comment_errors();

        router
            .dispatch(r#"{"event":"comment_error","data":{"message":"too long","articleId":"a1"}}"#)
            .expect("route");

        let error = errors.recv().await.expect("error");
        assert_eq!(error.message, "too long");
        assert_eq!(error.article_id.as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn test_notification_stream() {
        use tokio_stream::StreamExt;

        let router = router();
        let mut stream = router.notification_stream();

        router
            .dispatch(r#"{"event":"notification","data":{"type":"custom","title":"Hi","message":"there"}}"#)
            .expect("route");

        let event = stream.next().await.expect("item").expect("not lagged");
        assert_eq!(event.title, "Hi");
    }
}
