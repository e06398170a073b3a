//! Client configuration.
//!
//! Where the blog API lives, how patient to be with it, and the routes the
//! engine calls on it.

use std::fmt;
use std::time::Duration;

use super::error::ClientError;

/// Default base URL for the API.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5002/api";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default maximum retries.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default page size for comment listings.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page the comment API serves.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A route on the blog API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    /// Top-level comments of an article, one page.
    ArticleComments {
        /// Article ID.
        article_id: &'a str,
        /// 1-based page.
        page: u32,
        /// Page size.
        limit: u32,
    },
    /// Comment creation.
    Comments,
    /// One comment, for edit and delete.
    Comment(&'a str),
    /// Like toggle on a comment.
    CommentLike(&'a str),
    /// Replies to a comment, one page.
    Replies {
        /// Parent comment ID.
        comment_id: &'a str,
        /// 1-based page.
        page: u32,
        /// Page size.
        limit: u32,
    },
    /// Like toggle on an article.
    ArticleLike(&'a str),
    /// The server's VAPID public key.
    VapidKey,
    /// Push subscription registration.
    PushSubscribe,
}

impl fmt::Display for Route<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArticleComments {
                article_id,
                page,
                limit,
            } => write!(f, "/comments/article/{}?page={}&limit={}", article_id, page, limit),
            Self::Comments => write!(f, "/comments"),
            Self::Comment(id) => write!(f, "/comments/{}", id),
            Self::CommentLike(id) => write!(f, "/comments/{}/like", id),
            Self::Replies {
                comment_id,
                page,
                limit,
            } => write!(f, "/comments/{}/replies?page={}&limit={}", comment_id, page, limit),
            Self::ArticleLike(id) => write!(f, "/articles/{}/like", id),
            Self::VapidKey => write!(f, "/push-notifications/vapid-public-key"),
            Self::PushSubscribe => write!(f, "/push-notifications/subscribe"),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the blog API, including its `/api` prefix.
    pub base_url: String,

    /// Request timeout.
    pub timeout: Duration,

    /// Retries after a timeout or 429.
    pub max_retries: u32,

    /// Comments requested per page.
    pub page_size: u32,

    /// User agent string.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            page_size: DEFAULT_PAGE_SIZE,
            user_agent: format!("blogsync-sdk/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for the blog API at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry bound.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the page size for comment listings.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<(), ClientError> {
        let invalid = |msg: &str| Err(ClientError::InvalidConfig(msg.to_string()));

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return invalid("base_url must be an http(s) URL");
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return invalid("page_size must be between 1 and 100");
        }
        Ok(())
    }

    /// Returns the absolute URL of a route.
    #[must_use]
    pub fn url(&self, route: &Route<'_>) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_points_at_local_blog() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:5002/api");
        assert_eq!(config.page_size, 10);
        assert!(config.user_agent.starts_with("blogsync-sdk/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new("https://blog.example.com/api")
            .with_timeout(Duration::from_secs(5))
            .with_max_retries(0)
            .with_page_size(20)
            .with_user_agent("reader-app/2.1");

        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.page_size, 20);
        assert_eq!(config.user_agent, "reader-app/2.1");
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(ClientConfig::new("").validate().is_err());
        assert!(ClientConfig::new("blog.example.com/api").validate().is_err());
        assert!(ClientConfig::default().with_page_size(0).validate().is_err());
        assert!(ClientConfig::default().with_page_size(101).validate().is_err());
        assert!(ClientConfig::default().with_page_size(100).validate().is_ok());
    }

    #[test]
    fn test_routes() {
        let listing = Route::ArticleComments {
            article_id: "a1",
            page: 2,
            limit: 10,
        };
        assert_eq!(listing.to_string(), "/comments/article/a1?page=2&limit=10");
        assert_eq!(Route::CommentLike("c1").to_string(), "/comments/c1/like");
        assert_eq!(Route::ArticleLike("a1").to_string(), "/articles/a1/like");
        assert_eq!(
            Route::Replies {
                comment_id: "c1",
                page: 1,
                limit: 5
            }
            .to_string(),
            "/comments/c1/replies?page=1&limit=5"
        );
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let config = ClientConfig::new("http://localhost:5002/api/");
        assert_eq!(
            config.url(&Route::Comment("c1")),
            "http://localhost:5002/api/comments/c1"
        );
    }
}
