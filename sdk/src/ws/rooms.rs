//! Article room membership.
//!
//! Membership is counted per article so that two views of the same article
//! can join and leave independently. It is kept regardless of connection
//! state and replayed whenever the channel (re)connects.

use std::collections::BTreeMap;

use super::messages::ClientMessage;

/// Tracks the article rooms this client wants events for.
#[derive(Debug, Clone, Default)]
pub struct RoomTracker {
    rooms: BTreeMap<String, usize>,
}

impl RoomTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records interest in a room.
    ///
    /// Returns true if this is the first holder, i.e. a join frame is due.
    pub fn join(&mut self, article_id: &str) -> bool {
        let holders = self.rooms.entry(article_id.to_string()).or_insert(0);
        *holders += 1;
        *holders == 1
    }

    /// Drops one holder's interest in a room.
    ///
    /// Returns true if that was the last holder, i.e. a leave frame is due.
    pub fn leave(&mut self, article_id: &str) -> bool {
        match self.rooms.get_mut(article_id) {
            Some(holders) if *holders > 1 => {
                *holders -= 1;
                false
            }
            Some(_) => {
                self.rooms.remove(article_id);
                true
            }
            None => false,
        }
    }

    /// Returns true if the room is joined.
    #[must_use]
    pub fn contains(&self, article_id: &str) -> bool {
        self.rooms.contains_key(article_id)
    }

    /// Returns the number of holders for a room.
    #[must_use]
    pub fn holders(&self, article_id: &str) -> usize {
        self.rooms.get(article_id).copied().unwrap_or(0)
    }

    /// Returns the joined rooms in a stable order, for replay after reconnect.
    #[must_use]
    pub fn rooms(&self) -> Vec<String> {
        self.rooms.keys().cloned().collect()
    }

    /// Returns the join frames to send after the channel (re)connects.
    #[must_use]
    pub fn replay(&self) -> Vec<ClientMessage> {
        self.rooms
            .keys()
            .map(|article_id| ClientMessage::JoinArticle(article_id.clone()))
            .collect()
    }

    /// Returns the number of joined rooms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Returns true if no room is joined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Forgets every room.
    pub fn clear(&mut self) {
        self.rooms.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_first_holder_only() {
        let mut rooms = RoomTracker::new();
        assert!(rooms.join("a1"));
        assert!(!rooms.join("a1"));
        assert_eq!(rooms.holders("a1"), 2);
        assert_eq!(rooms.len(), 1);
    }

    #[test]
    fn test_leave_last_holder_only() {
        let mut rooms = RoomTracker::new();
        rooms.join("a1");
        rooms.join("a1");
        assert!(!rooms.leave("a1"));
        assert!(rooms.contains("a1"));
        assert!(rooms.leave("a1"));
        assert!(!rooms.contains("a1"));
    }

    #[test]
    fn test_leave_unknown_room() {
        let mut rooms = RoomTracker::new();
        assert!(!rooms.leave("a1"));
        assert!(rooms.is_empty());
    }

    #[test]
    fn test_rooms_sorted_for_replay() {
        let mut rooms = RoomTracker::new();
        rooms.join("b");
        rooms.join("a");
        rooms.join("c");
        assert_eq!(rooms.rooms(), vec!["a", "b", "c"]);
        assert_eq!(
            rooms.replay().first(),
            Some(&ClientMessage::JoinArticle("a".to_string()))
        );

        rooms.clear();
        assert!(rooms.is_empty());
    }
}
