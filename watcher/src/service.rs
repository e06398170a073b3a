//! Main watcher service.
//!
//! Opens one comment section per configured article on a shared channel,
//! then follows comments, article likes, notifications and connection
//! state until stopped. A rejected credential stops the service.

use std::sync::Arc;
use std::time::Duration;

use blogsync_sdk::sync::{IgnoreReason, ReconcileOutcome};
use blogsync_sdk::ws::{Transport, WsTransport};
use blogsync_sdk::{
    ArticleLikes, ClientError, CommentApi, CommentSection, ConnectionManager, ConnectionState,
    HttpClient, LoggingNavigator, MemorySession, NotificationFeed, SectionUpdate, SessionGuard,
    SyncError, SyncMetrics, WsError,
};
use chrono::Utc;
use tokio::sync::{broadcast::error::RecvError, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::config::{ConfigError, WatcherConfig};

/// Watcher errors.
#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be built.
    #[error("http client error: {0}")]
    Client(#[from] ClientError),

    /// The channel could not be set up.
    #[error("channel error: {0}")]
    Channel(#[from] WsError),

    /// A comment section failed to open.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),
}

/// The watcher service.
pub struct WatcherService<A: CommentApi = HttpClient, T: Transport = WsTransport> {
    /// Configuration.
    config: WatcherConfig,

    /// REST collaborator.
    api: Arc<A>,

    /// Shared channel.
    connection: ConnectionManager<T>,

    /// Set to true to stop every task.
    shutdown: Arc<watch::Sender<bool>>,
}

impl WatcherService<HttpClient, WsTransport> {
    /// Builds a service talking to the configured servers.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn from_config(config: WatcherConfig) -> Result<Self, WatcherError> {
        config.validate()?;

        let store = Arc::new(MemorySession::new());
        if let Some(token) = &config.token {
            store.sign_in(token.clone(), config.identity());
        }
        let session = SessionGuard::new(store, Arc::new(LoggingNavigator));

        let api = Arc::new(HttpClient::new(config.client_config(), session.clone())?);
        let connection = ConnectionManager::websocket(config.sync_config(), session)?;
        Ok(Self::new(config, api, connection))
    }
}

impl<A: CommentApi + 'static, T: Transport> WatcherService<A, T> {
    /// Creates a service over existing collaborators.
    #[must_use]
    pub fn new(config: WatcherConfig, api: Arc<A>, connection: ConnectionManager<T>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            api,
            connection,
            shutdown: Arc::new(shutdown),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Returns the shared channel.
    #[must_use]
    pub fn connection(&self) -> &ConnectionManager<T> {
        &self.connection
    }

    /// Returns the channel metrics.
    #[must_use]
    pub fn metrics(&self) -> Arc<SyncMetrics> {
        Arc::clone(self.connection.metrics())
    }

    /// Returns true while the service runs.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !*self.shutdown.borrow()
    }

    /// Stops the service.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
        info!("watcher stop requested");
    }

    /// Runs the service until stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if a comment section fails to open.
    pub async fn run(&self) -> Result<(), WatcherError> {
        self.shutdown.send_replace(false);
        let mut tasks = JoinSet::new();

        // Status first, so an immediate credential rejection is observed.
        tasks.spawn(watch_status(
            self.connection.clone(),
            Arc::clone(&self.shutdown),
        ));

        for article in &self.config.articles {
            let section = CommentSection::open(
                article.clone(),
                Arc::clone(&self.api),
                self.connection.clone(),
                self.config.page_size,
            )
            .await;

            match section {
                Ok(section) => {
                    info!(
                        article = %article,
                        loaded = section.tree().entry_count(),
                        total = section.page().total_comments,
                        "following article"
                    );
                    tasks.spawn(watch_section(
                        section,
                        self.shutdown.subscribe(),
                        self.config.sweep_interval(),
                    ));
                }
                Err(err) => {
                    self.stop();
                    while tasks.join_next().await.is_some() {}
                    return Err(err.into());
                }
            }
        }

        tasks.spawn(watch_likes(
            self.connection.clone(),
            self.config.articles.clone(),
            self.config.user_id.clone(),
            self.shutdown.subscribe(),
        ));
        tasks.spawn(watch_notifications(
            NotificationFeed::new(self.connection.router()),
            self.shutdown.subscribe(),
        ));

        info!(articles = self.config.articles.len(), "watcher started");

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "watcher task failed");
            }
        }

        let snapshot = self.connection.metrics().snapshot();
        info!(?snapshot, "watcher stopped");
        Ok(())
    }
}

async fn watch_status<T: Transport>(
    connection: ConnectionManager<T>,
    shutdown: Arc<watch::Sender<bool>>,
) {
    let mut status = connection.subscribe_status();
    let mut stop = shutdown.subscribe();

    loop {
        tokio::select! {
            () = stopped(&mut stop) => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *status.borrow_and_update();
                info!(%state, "connection state");

                if state == ConnectionState::AuthFailed {
                    error!("credential rejected, stopping watcher");
                    shutdown.send_replace(true);
                    break;
                }
            }
        }
    }
}

async fn watch_section<A: CommentApi + 'static, T: Transport>(
    mut section: CommentSection<A, T>,
    mut stop: watch::Receiver<bool>,
    sweep: Duration,
) {
    let mut sweeper = tokio::time::interval(sweep);

    loop {
        let step = tokio::select! {
            () = stopped(&mut stop) => Step::Stop,
            _ = sweeper.tick() => Step::Sweep,
            update = section.next_update() => Step::Update(update),
        };

        match step {
            Step::Stop | Step::Update(None) => break,
            Step::Sweep => {
                let expired = section.expire_pending(Utc::now());
                if !expired.is_empty() {
                    warn!(article = section.article_id(), count = expired.len(), "pending comments expired");
                }
            }
            Step::Update(Some(update)) => log_update(section.article_id(), &update),
        }
    }

    section.close();
}

enum Step {
    Stop,
    Sweep,
    Update(Option<SectionUpdate>),
}

/// Resolves once the shutdown flag is set or its sender is gone.
async fn stopped(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

fn log_update(article: &str, update: &SectionUpdate) {
    match update {
        SectionUpdate::Comment(ReconcileOutcome::Inserted { id }) => {
            info!(article, id = %id, "new comment");
        }
        SectionUpdate::Comment(ReconcileOutcome::Replaced { synthetic_id, id }) => {
            info!(article, synthetic = %synthetic_id, id = %id, "comment confirmed");
        }
        SectionUpdate::Comment(ReconcileOutcome::Refreshed { id }) => {
            debug!(article, id = %id, "comment redelivered");
        }
        SectionUpdate::Comment(ReconcileOutcome::Ignored(IgnoreReason::OrphanReply {
            parent_id,
        })) => {
            debug!(article, parent = %parent_id, "reply to unloaded comment");
        }
        SectionUpdate::Comment(ReconcileOutcome::Ignored(IgnoreReason::ForeignArticle)) => {}
        SectionUpdate::Rejected { error, mutation } => {
            warn!(article, reason = %error.message, rolled_back = mutation.is_some(), "comment rejected");
        }
    }
}

async fn watch_likes<T: Transport>(
    connection: ConnectionManager<T>,
    articles: Vec<String>,
    user_id: String,
    mut stop: watch::Receiver<bool>,
) {
    let mut events = connection.router().subscribe_article_likes();
    let mut likes = ArticleLikes::new(Some(user_id));

    loop {
        tokio::select! {
            () = stopped(&mut stop) => break,
            received = events.recv() => match received {
                Ok(event) => {
                    if !articles.contains(&event.article_id) {
                        continue;
                    }
                    if !likes.apply_broadcast(&event) {
                        likes.track(&event.article_id, event.like_count, event.user_liked.unwrap_or(false));
                    }
                    info!(article = %event.article_id, likes = event.like_count, "article likes changed");
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "article like stream lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }
}

async fn watch_notifications(mut feed: NotificationFeed, mut stop: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            () = stopped(&mut stop) => break,
            received = feed.next() => {
                let Some(notification) = received else {
                    break;
                };
                info!(
                    id = notification.id,
                    kind = ?notification.event.kind,
                    title = %notification.event.title,
                    "notification"
                );
            }
        }
    }
    debug!(received = feed.len(), unread = feed.unread_count(), "notification feed closed");
}
