//! Article like counters.
//!
//! Counters are never incremented locally. A toggle marks the article as
//! in flight, and the response overwrites count and flag with the server's
//! values. Broadcasts carry the same authoritative total, so applying one
//! for the user's own toggle is idempotent.

use std::collections::HashMap;

use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, warn};

use crate::client::ArticleApi;
use crate::error::SyncError;
use crate::types::{ArticleLikeResponse, ArticleLikeState};
use crate::ws::ArticleLiked;

/// Like state of every article rendered by this client.
#[derive(Debug, Clone, Default)]
pub struct ArticleLikes {
    user_id: Option<String>,
    articles: HashMap<String, ArticleLikeState>,
}

impl ArticleLikes {
    /// Creates an empty tracker for the given signed-in user.
    #[must_use]
    pub fn new(user_id: Option<String>) -> Self {
        Self {
            user_id,
            articles: HashMap::new(),
        }
    }

    /// Starts tracking an article with its loaded counter.
    pub fn track(&mut self, article_id: &str, like_count: u64, user_liked: bool) {
        self.articles.insert(
            article_id.to_string(),
            ArticleLikeState::new(article_id, like_count, user_liked),
        );
    }

    /// Stops tracking an article.
    pub fn untrack(&mut self, article_id: &str) -> Option<ArticleLikeState> {
        self.articles.remove(article_id)
    }

    /// Returns an article's like state.
    #[must_use]
    pub fn get(&self, article_id: &str) -> Option<&ArticleLikeState> {
        self.articles.get(article_id)
    }

    /// Marks a toggle as in flight.
    ///
    /// Returns false if the article is untracked or a toggle is already in
    /// flight; the caller must not submit in that case.
    pub fn begin_toggle(&mut self, article_id: &str) -> bool {
        match self.articles.get_mut(article_id) {
            Some(state) if !state.liking => {
                state.liking = true;
                true
            }
            _ => false,
        }
    }

    /// Applies a toggle response and clears the in-flight mark.
    pub fn complete_toggle(&mut self, article_id: &str, response: ArticleLikeResponse) {
        if let Some(state) = self.articles.get_mut(article_id) {
            state.apply(response);
            state.liking = false;
        }
    }

    /// Clears the in-flight mark after a failed toggle.
    pub fn abort_toggle(&mut self, article_id: &str) {
        if let Some(state) = self.articles.get_mut(article_id) {
            state.liking = false;
        }
    }

    /// Toggles the user's like on an article.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::LikeInFlight`] without calling the server if a
    /// toggle has not completed, or the request error.
    pub async fn toggle<A: ArticleApi>(
        &mut self,
        api: &A,
        article_id: &str,
    ) -> Result<ArticleLikeState, SyncError> {
        if !self.begin_toggle(article_id) {
            return Err(SyncError::LikeInFlight(article_id.to_string()));
        }

        match api.toggle_article_like(article_id).await {
            Ok(response) => {
                self.complete_toggle(article_id, response);
                debug!(article = article_id, likes = response.like_count, liked = response.user_liked, "article like toggled");
                self.get(article_id)
                    .cloned()
                    .ok_or_else(|| SyncError::LikeInFlight(article_id.to_string()))
            }
            Err(err) => {
                self.abort_toggle(article_id);
                warn!(article = article_id, error = %err, "article like failed");
                Err(err.into())
            }
        }
    }

    /// Applies an `article_liked` broadcast.
    ///
    /// The total always overwrites. The user flag changes only when the
    /// broadcast names the signed-in user. Returns false for untracked
    /// articles.
    pub fn apply_broadcast(&mut self, event: &ArticleLiked) -> bool {
        let Some(state) = self.articles.get_mut(&event.article_id) else {
            return false;
        };

        state.like_count = event.like_count;
        let own = matches!((&self.user_id, &event.user_id), (Some(me), Some(who)) if me == who);
        if let (true, Some(liked)) = (own, event.user_liked) {
            state.user_liked = liked;
        }
        true
    }

    /// Applies every broadcast already queued on `events`.
    ///
    /// Returns the number applied to tracked articles.
    pub fn pump(&mut self, events: &mut broadcast::Receiver<ArticleLiked>) -> usize {
        let mut applied = 0;
        loop {
            match events.try_recv() {
                Ok(event) => {
                    if self.apply_broadcast(&event) {
                        applied += 1;
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "article like stream lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return applied,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockApi;

    fn liked(article: &str, count: u64, user: Option<&str>, user_liked: Option<bool>) -> ArticleLiked {
        ArticleLiked {
            article_id: article.to_string(),
            like_count: count,
            user_id: user.map(str::to_string),
            user_liked,
        }
    }

    #[test]
    fn test_toggle_overwrites_despite_broadcast() {
        let mut likes = ArticleLikes::new(Some("u1".to_string()));
        likes.track("a1", 5, false);

        assert!(likes.begin_toggle("a1"));
        assert!(likes.apply_broadcast(&liked("a1", 6, Some("u1"), Some(true))));
        likes.complete_toggle(
            "a1",
            ArticleLikeResponse {
                like_count: 6,
                user_liked: true,
            },
        );

        let state = likes.get("a1").expect("tracked");
        assert_eq!(state.like_count, 6);
        assert!(state.user_liked);
        assert!(!state.liking);
    }

    #[test]
    fn test_second_begin_rejected_while_in_flight() {
        let mut likes = ArticleLikes::new(Some("u1".to_string()));
        likes.track("a1", 5, false);

        assert!(likes.begin_toggle("a1"));
        assert!(!likes.begin_toggle("a1"));
        assert!(!likes.begin_toggle("untracked"));

        likes.abort_toggle("a1");
        assert!(likes.begin_toggle("a1"));
    }

    #[test]
    fn test_broadcast_from_other_user_keeps_flag() {
        let mut likes = ArticleLikes::new(Some("u1".to_string()));
        likes.track("a1", 5, true);

        likes.apply_broadcast(&liked("a1", 7, Some("u2"), Some(false)));
        let state = likes.get("a1").expect("tracked");
        assert_eq!(state.like_count, 7);
        assert!(state.user_liked);

        assert!(!likes.apply_broadcast(&liked("a9", 1, None, None)));
    }

    #[tokio::test]
    async fn test_toggle_with_api() {
        let api = MockApi::default();
        let mut likes = ArticleLikes::new(Some("u1".to_string()));
        likes.track("a1", 5, false);

        let state = likes.toggle(&api, "a1").await.expect("toggle");
        assert_eq!(state.like_count, 6);
        assert!(state.user_liked);
        assert!(!state.liking);
        assert_eq!(api.article_like_calls(), 1);
    }

    #[tokio::test]
    async fn test_toggle_in_flight_skips_api() {
        let api = MockApi::default();
        let mut likes = ArticleLikes::new(Some("u1".to_string()));
        likes.track("a1", 5, false);
        assert!(likes.begin_toggle("a1"));

        let result = likes.toggle(&api, "a1").await;

        assert!(matches!(result, Err(SyncError::LikeInFlight(_))));
        assert_eq!(api.article_like_calls(), 0);
        assert_eq!(likes.get("a1").map(|s| s.like_count), Some(5));
    }

    #[test]
    fn test_pump() {
        let (tx, mut rx) = broadcast::channel(8);
        let mut likes = ArticleLikes::new(None);
        likes.track("a1", 0, false);

        tx.send(liked("a1", 3, None, None)).expect("send");
        tx.send(liked("a2", 9, None, None)).expect("send");

        assert_eq!(likes.pump(&mut rx), 1);
        assert_eq!(likes.get("a1").map(|s| s.like_count), Some(3));
    }
}
