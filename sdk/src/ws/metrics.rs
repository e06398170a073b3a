//! Synchronization metrics tracking.
//!
//! Provides atomic counters for monitoring the channel and reconciliation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::messages::EventCategory;

/// Metrics for the synchronization engine.
#[derive(Debug)]
pub struct SyncMetrics {
    /// Connect attempts made.
    connect_attempts: AtomicU64,

    /// Channels established.
    connections_established: AtomicU64,

    /// Channels lost or closed.
    disconnects: AtomicU64,

    /// Credentials rejected.
    auth_failures: AtomicU64,

    /// Frames received.
    frames_received: AtomicU64,

    /// Frames sent.
    frames_sent: AtomicU64,

    /// Events routed to `comment_added`.
    comments_routed: AtomicU64,

    /// Events routed to `article_liked`.
    likes_routed: AtomicU64,

    /// Events routed to `notification`.
    notifications_routed: AtomicU64,

    /// Events routed to `comment_error`.
    comment_errors_routed: AtomicU64,

    /// Frames dropped as malformed or unknown.
    events_dropped: AtomicU64,

    /// Provisional entries replaced by confirmed ones.
    reconciled_replaced: AtomicU64,

    /// Confirmed entries inserted without a provisional match.
    reconciled_inserted: AtomicU64,

    /// Duplicate deliveries absorbed.
    reconciled_duplicates: AtomicU64,

    /// Optimistic mutations rolled back.
    mutations_failed: AtomicU64,

    /// Start time for rate calculation.
    start_time: Instant,
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncMetrics {
    /// Creates a new metrics instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connect_attempts: AtomicU64::new(0),
            connections_established: AtomicU64::new(0),
            disconnects: AtomicU64::new(0),
            auth_failures: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            comments_routed: AtomicU64::new(0),
            likes_routed: AtomicU64::new(0),
            notifications_routed: AtomicU64::new(0),
            comment_errors_routed: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            reconciled_replaced: AtomicU64::new(0),
            reconciled_inserted: AtomicU64::new(0),
            reconciled_duplicates: AtomicU64::new(0),
            mutations_failed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Records a connect attempt.
    pub fn record_connect_attempt(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an established channel.
    pub fn record_connected(&self) {
        self.connections_established.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a lost or closed channel.
    pub fn record_disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a rejected credential.
    pub fn record_auth_failure(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a received frame.
    pub fn record_frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a sent frame.
    pub fn record_frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an event routed to a stream.
    pub fn record_routed(&self, category: EventCategory) {
        let counter = match category {
            EventCategory::CommentAdded => &self.comments_routed,
            EventCategory::ArticleLiked => &self.likes_routed,
            EventCategory::Notification => &self.notifications_routed,
            EventCategory::CommentError => &self.comment_errors_routed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a dropped frame.
    pub fn record_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a provisional entry replaced by its confirmation.
    pub fn record_replaced(&self) {
        self.reconciled_replaced.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a confirmed entry inserted without a provisional match.
    pub fn record_inserted(&self) {
        self.reconciled_inserted.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an absorbed duplicate delivery.
    pub fn record_duplicate(&self) {
        self.reconciled_duplicates.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a rolled back mutation.
    pub fn record_mutation_failed(&self) {
        self.mutations_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the connect attempts made.
    #[must_use]
    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts.load(Ordering::Relaxed)
    }

    /// Returns the channels established.
    #[must_use]
    pub fn connections_established(&self) -> u64 {
        self.connections_established.load(Ordering::Relaxed)
    }

    /// Returns the channels lost or closed.
    #[must_use]
    pub fn disconnects(&self) -> u64 {
        self.disconnects.load(Ordering::Relaxed)
    }

    /// Returns the credentials rejected.
    #[must_use]
    pub fn auth_failures(&self) -> u64 {
        self.auth_failures.load(Ordering::Relaxed)
    }

    /// Returns the frames received.
    #[must_use]
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Returns the frames sent.
    #[must_use]
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    /// Returns the events routed to a stream.
    #[must_use]
    pub fn routed(&self, category: EventCategory) -> u64 {
        match category {
            EventCategory::CommentAdded => self.comments_routed.load(Ordering::Relaxed),
            EventCategory::ArticleLiked => self.likes_routed.load(Ordering::Relaxed),
            EventCategory::Notification => self.notifications_routed.load(Ordering::Relaxed),
            EventCategory::CommentError => self.comment_errors_routed.load(Ordering::Relaxed),
        }
    }

    /// Returns the frames dropped.
    #[must_use]
    pub fn events_dropped(&self) -> u64 {
        self.events_dropped.load(Ordering::Relaxed)
    }

    /// Returns the provisional entries replaced.
    #[must_use]
    pub fn reconciled_replaced(&self) -> u64 {
        self.reconciled_replaced.load(Ordering::Relaxed)
    }

    /// Returns the confirmed entries inserted without a match.
    #[must_use]
    pub fn reconciled_inserted(&self) -> u64 {
        self.reconciled_inserted.load(Ordering::Relaxed)
    }

    /// Returns the duplicate deliveries absorbed.
    #[must_use]
    pub fn reconciled_duplicates(&self) -> u64 {
        self.reconciled_duplicates.load(Ordering::Relaxed)
    }

    /// Returns the mutations rolled back.
    #[must_use]
    pub fn mutations_failed(&self) -> u64 {
        self.mutations_failed.load(Ordering::Relaxed)
    }

    /// Returns the uptime.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns a snapshot of all metrics.
    #[must_use]
    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        SyncMetricsSnapshot {
            connect_attempts: self.connect_attempts(),
            connections_established: self.connections_established(),
            disconnects: self.disconnects(),
            auth_failures: self.auth_failures(),
            frames_received: self.frames_received(),
            frames_sent: self.frames_sent(),
            events_dropped: self.events_dropped(),
            reconciled_replaced: self.reconciled_replaced(),
            reconciled_inserted: self.reconciled_inserted(),
            reconciled_duplicates: self.reconciled_duplicates(),
            mutations_failed: self.mutations_failed(),
            uptime: self.uptime(),
        }
    }
}

/// A point-in-time snapshot of synchronization metrics.
#[derive(Debug, Clone)]
pub struct SyncMetricsSnapshot {
    /// Connect attempts.
    pub connect_attempts: u64,
    /// Channels established.
    pub connections_established: u64,
    /// Channels lost or closed.
    pub disconnects: u64,
    /// Credentials rejected.
    pub auth_failures: u64,
    /// Frames received.
    pub frames_received: u64,
    /// Frames sent.
    pub frames_sent: u64,
    /// Frames dropped.
    pub events_dropped: u64,
    /// Provisional entries replaced.
    pub reconciled_replaced: u64,
    /// Confirmed entries inserted without a match.
    pub reconciled_inserted: u64,
    /// Duplicate deliveries absorbed.
    pub reconciled_duplicates: u64,
    /// Mutations rolled back.
    pub mutations_failed: u64,
    /// Uptime.
    pub uptime: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = SyncMetrics::new();
        assert_eq!(metrics.connect_attempts(), 0);
        assert_eq!(metrics.connections_established(), 0);
        assert_eq!(metrics.events_dropped(), 0);
    }

    #[test]
    fn test_metrics_record_lifecycle() {
        let metrics = SyncMetrics::new();

        metrics.record_connect_attempt();
        metrics.record_connect_attempt();
        metrics.record_connected();
        metrics.record_disconnect();
        metrics.record_auth_failure();

        assert_eq!(metrics.connect_attempts(), 2);
        assert_eq!(metrics.connections_established(), 1);
        assert_eq!(metrics.disconnects(), 1);
        assert_eq!(metrics.auth_failures(), 1);
    }

    #[test]
    fn test_metrics_record_routed() {
        let metrics = SyncMetrics::new();

        metrics.record_routed(EventCategory::CommentAdded);
        metrics.record_routed(EventCategory::CommentAdded);
        metrics.record_routed(EventCategory::Notification);

        assert_eq!(metrics.routed(EventCategory::CommentAdded), 2);
        assert_eq!(metrics.routed(EventCategory::Notification), 1);
        assert_eq!(metrics.routed(EventCategory::ArticleLiked), 0);
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = SyncMetrics::new();

        metrics.record_frame_received();
        metrics.record_frame_sent();
        metrics.record_replaced();
        metrics.record_inserted();
        metrics.record_duplicate();
        metrics.record_mutation_failed();

        let snapshot = metrics.snapshot();

        assert_eq!(snapshot.frames_received, 1);
        assert_eq!(snapshot.frames_sent, 1);
        assert_eq!(snapshot.reconciled_replaced, 1);
        assert_eq!(snapshot.reconciled_inserted, 1);
        assert_eq!(snapshot.reconciled_duplicates, 1);
        assert_eq!(snapshot.mutations_failed, 1);
    }
}
