//! Notification feed.
//!
//! The feed behind the notification bell. Received notifications get a
//! client-assigned id and start unread; the newest comes first. Read state
//! lives only in memory.

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

use crate::types::{Notification, NotificationEvent};
use crate::ws::EventRouter;

/// Unread counts above this are shown as a capped badge.
pub const BADGE_CAP: usize = 99;

/// In-memory notification feed fed by the router.
#[derive(Debug)]
pub struct NotificationFeed {
    items: Vec<Notification>,
    next_id: u64,
    events: broadcast::Receiver<NotificationEvent>,
}

impl NotificationFeed {
    /// Creates an empty feed subscribed to the router's notification stream.
    #[must_use]
    pub fn new(router: &EventRouter) -> Self {
        Self {
            items: Vec::new(),
            next_id: 0,
            events: router.subscribe_notifications(),
        }
    }

    /// Returns the notifications, newest first.
    #[must_use]
    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    /// Returns the number of notifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the feed is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the number of unread notifications.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.read).count()
    }

    /// Returns the badge text, or None when everything is read.
    #[must_use]
    pub fn badge(&self) -> Option<String> {
        match self.unread_count() {
            0 => None,
            n if n > BADGE_CAP => Some(format!("{}+", BADGE_CAP)),
            n => Some(n.to_string()),
        }
    }

    /// Adds a notification at the head of the feed and returns its id.
    pub fn push(&mut self, event: NotificationEvent) -> u64 {
        self.next_id += 1;

        debug!(id = self.next_id, kind = ?event.kind, title = %event.title, "notification received");
        self.items.insert(
            0,
            Notification {
                id: self.next_id,
                read: false,
                event,
            },
        );
        self.next_id
    }

    /// Marks one notification read. Returns false for unknown ids.
    pub fn mark_read(&mut self, id: u64) -> bool {
        match self.items.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                true
            }
            None => false,
        }
    }

    /// Marks every notification read and returns how many changed.
    pub fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for notification in self.items.iter_mut().filter(|n| !n.read) {
            notification.read = true;
            changed += 1;
        }
        changed
    }

    /// Removes every notification.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Adds every notification already queued on the stream.
    ///
    /// Returns the number added.
    pub fn pump(&mut self) -> usize {
        let mut added = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.push(event);
                    added += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "notification stream lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return added,
            }
        }
    }

    /// Waits for the next notification and adds it.
    ///
    /// Returns None once the stream is closed.
    pub async fn next(&mut self) -> Option<&Notification> {
        loop {
            match self.events.recv().await {
                Ok(event) => {
                    self.push(event);
                    return self.items.first();
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "notification stream lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;
    use crate::types::NotificationKind;
    use crate::ws::SyncMetrics;

    fn event(title: &str) -> NotificationEvent {
        NotificationEvent {
            kind: NotificationKind::CommentReply,
            title: title.to_string(),
            message: "bob replied".to_string(),
            data: None,
            created_at: Utc::now(),
        }
    }

    fn router() -> EventRouter {
        EventRouter::new(16, Arc::new(SyncMetrics::new()))
    }

    #[test]
    fn test_push_newest_first() {
        let mut feed = NotificationFeed::new(&router());
        let first = feed.push(event("one"));
        let second = feed.push(event("two"));

        assert_ne!(first, second);
        let titles: Vec<&str> = feed.items().iter().map(|n| n.event.title.as_str()).collect();
        assert_eq!(titles, vec!["two", "one"]);
        assert_eq!(feed.unread_count(), 2);
    }

    #[test]
    fn test_mark_read() {
        let mut feed = NotificationFeed::new(&router());
        let id = feed.push(event("one"));
        feed.push(event("two"));

        assert!(feed.mark_read(id));
        assert!(!feed.mark_read(999));
        assert_eq!(feed.unread_count(), 1);

        assert_eq!(feed.mark_all_read(), 1);
        assert_eq!(feed.unread_count(), 0);
        assert_eq!(feed.badge(), None);
    }

    #[test]
    fn test_badge_capped() {
        let mut feed = NotificationFeed::new(&router());
        for i in 0..100 {
            feed.push(event(&i.to_string()));
        }
        assert_eq!(feed.badge(), Some("99+".to_string()));
    }

    #[test]
    fn test_pump_from_router() {
        let router = router();
        let mut feed = NotificationFeed::new(&router);
        let frame = r#"{"event":"notification","data":{"type":"new_comment","title":"New comment","message":"hi"}}"#;

        router.dispatch(frame).expect("routed");
        router.dispatch(frame).expect("routed");

        assert_eq!(feed.pump(), 2);
        assert_eq!(feed.len(), 2);
        assert_eq!(feed.pump(), 0);
    }

    #[tokio::test]
    async fn test_next() {
        let router = router();
        let mut feed = NotificationFeed::new(&router);
        router
            .dispatch(r#"{"event":"notification","data":{"type":"custom","title":"Hello","message":"m"}}"#)
            .expect("routed");

        let received = feed.next().await.expect("notification");
        assert_eq!(received.event.title, "Hello");
        assert!(!received.read);
    }
}
