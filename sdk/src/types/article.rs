//! Article like-counter types.

use serde::{Deserialize, Serialize};

/// Response to an article like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleLikeResponse {
    /// Authoritative like total.
    pub like_count: u64,

    /// Whether the current user now likes the article.
    pub user_liked: bool,
}

/// Client-side like state for one rendered article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleLikeState {
    /// Article ID.
    pub article_id: String,

    /// Last authoritative like total.
    pub like_count: u64,

    /// Whether the current user likes the article.
    pub user_liked: bool,

    /// Whether a toggle is in flight.
    pub liking: bool,
}

impl ArticleLikeState {
    /// Creates a new like state with no toggle in flight.
    #[must_use]
    pub fn new(article_id: impl Into<String>, like_count: u64, user_liked: bool) -> Self {
        Self {
            article_id: article_id.into(),
            like_count,
            user_liked,
            liking: false,
        }
    }

    /// Overwrites counter and flag with authoritative values.
    pub fn apply(&mut self, response: ArticleLikeResponse) {
        self.like_count = response.like_count;
        self.user_liked = response.user_liked;
    }
}
