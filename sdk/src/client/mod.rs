//! HTTP collaborator for the blog REST API.
//!
//! [`CommentApi`], [`ArticleApi`] and [`PushRegistrar`] are the contracts
//! the synchronization engine consumes; [`HttpClient`] implements them over
//! `reqwest`.
//!
//! # Example
//!
//! ```rust,ignore
//! use blogsync_sdk::client::{ClientConfig, CommentApi, HttpClient};
//!
//! let client = HttpClient::new(ClientConfig::default(), session)?;
//! let page = client.list_by_article("a1", 1, 10).await?;
//! println!("{} comments", page.total_comments);
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod http;

pub use api::{ArticleApi, CommentApi, PushRegistrar};
pub use config::{ClientConfig, Route};
pub use error::ClientError;
pub use http::HttpClient;
