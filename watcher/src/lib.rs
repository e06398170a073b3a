//! Blogsync Watcher - Service that follows comment activity on articles.
//!
//! Opens a comment section per configured article over one shared real-time
//! channel and logs comments, article likes and notifications as they arrive.
//! Pending comments that never reach a final state are swept periodically.
//!
//! # Components
//!
//! - [`config`]: Watcher configuration
//! - [`service`]: Main watcher service

pub mod config;
pub mod service;

pub use config::{ConfigError, WatcherConfig};
pub use service::{WatcherError, WatcherService};
