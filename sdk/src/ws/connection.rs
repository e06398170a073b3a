//! Connection manager for the shared real-time channel.
//!
//! A single [`ConnectionManager`] owns the channel for the whole process.
//! Views hold a [`ConnectionLease`]; the channel connects on the first lease
//! and disconnects when the last one is released. A supervisor task drives
//! the connect, reconnect and auth-failure transitions and publishes every
//! state change on a `watch` channel.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, timeout, Instant};
use tokio_stream::wrappers::WatchStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

use super::config::SyncConfig;
use super::error::{is_auth_reason, WsError};
use super::messages::{ClientMessage, InboundEvent, NewComment};
use super::metrics::SyncMetrics;
use super::rooms::RoomTracker;
use super::router::EventRouter;
use super::transport::{ChannelHandle, Transport, TransportEvent, WsTransport};
use crate::session::SessionGuard;

/// Channel connection state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No channel and no attempt in progress.
    #[default]
    Disconnected,
    /// An attempt is in progress.
    Connecting,
    /// The channel is open.
    Connected,
    /// The credential was rejected. Terminal for that credential.
    AuthFailed,
}

impl ConnectionState {
    /// Returns true if the channel is open.
    #[must_use]
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::AuthFailed => write!(f, "auth_failed"),
        }
    }
}

/// How an open channel ended.
enum ChannelEnd {
    Closed(Option<String>),
    AuthRejected(String),
}

struct Shared<T> {
    config: SyncConfig,
    transport: T,
    state: watch::Sender<ConnectionState>,
    outbound: Mutex<Option<mpsc::Sender<String>>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    rooms: Mutex<RoomTracker>,
    leases: Mutex<usize>,
    rejected_token: Mutex<Option<String>>,
    router: EventRouter,
    session: SessionGuard,
    metrics: Arc<SyncMetrics>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-wide handle to the real-time channel.
///
/// Cloning is cheap; every clone refers to the same channel, room set and
/// event streams.
pub struct ConnectionManager<T: Transport = WsTransport> {
    shared: Arc<Shared<T>>,
}

impl<T: Transport> Clone for ConnectionManager<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Transport> std::fmt::Debug for ConnectionManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("url", &self.shared.config.url)
            .field("state", &self.state())
            .field("leases", &self.leases())
            .finish_non_exhaustive()
    }
}

impl ConnectionManager<WsTransport> {
    /// Creates a manager over a WebSocket transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn websocket(config: SyncConfig, session: SessionGuard) -> Result<Self, WsError> {
        let transport = WsTransport::new(config.outbound_capacity);
        Self::new(config, transport, session)
    }
}

impl<T: Transport> ConnectionManager<T> {
    /// Creates a new manager.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: SyncConfig, transport: T, session: SessionGuard) -> Result<Self, WsError> {
        config.validate()?;

        let metrics = Arc::new(SyncMetrics::new());
        let router = EventRouter::new(config.event_capacity, Arc::clone(&metrics));
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                transport,
                state,
                outbound: Mutex::new(None),
                supervisor: Mutex::new(None),
                rooms: Mutex::new(RoomTracker::new()),
                leases: Mutex::new(0),
                rejected_token: Mutex::new(None),
                router,
                session,
                metrics,
            }),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.shared.config
    }

    /// Returns the event router.
    #[must_use]
    pub fn router(&self) -> &EventRouter {
        &self.shared.router
    }

    /// Returns the shared metrics.
    #[must_use]
    pub fn metrics(&self) -> &Arc<SyncMetrics> {
        &self.shared.metrics
    }

    /// Returns the session guard used for auth-failure recovery.
    #[must_use]
    pub fn session(&self) -> &SessionGuard {
        &self.shared.session
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Returns true if the channel is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Returns the connection status as a stream of booleans.
    ///
    /// The current status is yielded first, then every change.
    #[must_use]
    pub fn subscribe_connected(&self) -> impl Stream<Item = bool> + Send + Unpin + 'static {
        WatchStream::new(self.shared.state.subscribe()).map(ConnectionState::is_connected)
    }

    /// Returns the joined rooms.
    #[must_use]
    pub fn rooms(&self) -> Vec<String> {
        lock(&self.shared.rooms).rooms()
    }

    /// Returns the number of live leases.
    #[must_use]
    pub fn leases(&self) -> usize {
        *lock(&self.shared.leases)
    }

    /// Starts connecting with the given credential.
    ///
    /// Idempotent: returns immediately if a channel is open or an attempt is
    /// in progress. Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::MissingToken`] for an empty token and
    /// [`WsError::Auth`] if this token was already rejected.
    pub fn connect(&self, token: &str) -> Result<(), WsError> {
        if token.is_empty() {
            return Err(WsError::MissingToken);
        }

        if self.state() == ConnectionState::AuthFailed
            && lock(&self.shared.rejected_token).as_deref() == Some(token)
        {
            return Err(WsError::Auth("credential already rejected".to_string()));
        }

        let mut supervisor = lock(&self.shared.supervisor);
        if supervisor
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
        {
            debug!("connect ignored, channel already active");
            return Ok(());
        }

        *lock(&self.shared.rejected_token) = None;
        let shared = Arc::clone(&self.shared);
        let token = token.to_string();
        *supervisor = Some(tokio::spawn(async move { shared.supervise(token).await }));

        Ok(())
    }

    /// Tears down the channel.
    ///
    /// Safe to call when already disconnected. Room membership is cleared.
    pub fn disconnect(&self) {
        if let Some(handle) = lock(&self.shared.supervisor).take() {
            handle.abort();
        }

        if lock(&self.shared.outbound).take().is_some() {
            self.shared.metrics.record_disconnect();
        }
        lock(&self.shared.rooms).clear();

        if self.state() != ConnectionState::AuthFailed {
            self.shared.set_state(ConnectionState::Disconnected);
        }
        info!("real-time channel disconnected");
    }

    /// Takes a lease on the channel, connecting if this is the first one.
    ///
    /// # Errors
    ///
    /// Returns an error if connecting fails to start.
    pub fn lease(&self, token: &str) -> Result<ConnectionLease<T>, WsError> {
        self.connect(token)?;

        let mut leases = lock(&self.shared.leases);
        *leases += 1;
        debug!(leases = *leases, "connection leased");

        Ok(ConnectionLease {
            manager: self.clone(),
        })
    }

    fn release(&self) {
        let remaining = {
            let mut leases = lock(&self.shared.leases);
            *leases = leases.saturating_sub(1);
            *leases
        };
        debug!(leases = remaining, "connection lease released");

        if remaining == 0 {
            self.disconnect();
        }
    }

    /// Joins an article room.
    ///
    /// Membership is recorded even while disconnected and replayed on the
    /// next connect. Returns true if a join frame was sent.
    pub fn join_article_room(&self, article_id: &str) -> bool {
        let mut rooms = lock(&self.shared.rooms);
        if !rooms.join(article_id) {
            return false;
        }

        let sent = self
            .shared
            .send_if_open(&ClientMessage::JoinArticle(article_id.to_string()));
        debug!(article = article_id, sent, "joined article room");
        sent
    }

    /// Leaves an article room.
    ///
    /// Returns true if a leave frame was sent.
    pub fn leave_article_room(&self, article_id: &str) -> bool {
        let mut rooms = lock(&self.shared.rooms);
        if !rooms.leave(article_id) {
            return false;
        }

        let sent = self
            .shared
            .send_if_open(&ClientMessage::LeaveArticle(article_id.to_string()));
        debug!(article = article_id, sent, "left article room");
        sent
    }

    /// Emits a `new_comment` frame.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::NotConnected`] if the channel is not open, or
    /// [`WsError::SendFailed`] if the outbound queue is full.
    pub fn emit_new_comment(&self, comment: NewComment) -> Result<(), WsError> {
        let outbound = lock(&self.shared.outbound)
            .clone()
            .ok_or(WsError::NotConnected)?;
        self.shared
            .send_on(&outbound, &ClientMessage::NewComment(comment))
    }
}

impl<T: Transport> Shared<T> {
    fn set_state(&self, next: ConnectionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            debug!(state = %next, "connection state changed");
        }
    }

    fn send_on(&self, outbound: &mpsc::Sender<String>, msg: &ClientMessage) -> Result<(), WsError> {
        let frame = msg.to_frame()?;
        outbound.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                WsError::SendFailed("outbound queue full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => WsError::NotConnected,
        })?;
        self.metrics.record_frame_sent();
        Ok(())
    }

    fn send_if_open(&self, msg: &ClientMessage) -> bool {
        let Some(outbound) = lock(&self.outbound).clone() else {
            return false;
        };
        match self.send_on(&outbound, msg) {
            Ok(()) => true,
            Err(e) => {
                warn!("control frame not sent: {}", e);
                false
            }
        }
    }

    async fn supervise(self: Arc<Self>, token: String) {
        let url = match self.config.connection_url(&token) {
            Ok(url) => url,
            Err(err) => {
                error!("cannot build channel url: {}", err);
                self.set_state(ConnectionState::Disconnected);
                return;
            }
        };
        let mut retries: u32 = 0;

        loop {
            self.set_state(ConnectionState::Connecting);
            self.metrics.record_connect_attempt();
            info!(attempt = retries + 1, "connecting to real-time channel");

            let attempt = match timeout(self.config.connect_timeout, self.transport.open(&url)).await
            {
                Ok(result) => result,
                Err(_) => Err(WsError::Timeout),
            };

            match attempt {
                Ok(channel) => {
                    retries = 0;
                    match self.run_channel(channel).await {
                        ChannelEnd::AuthRejected(reason) => {
                            self.fail_auth(&token, &reason);
                            return;
                        }
                        ChannelEnd::Closed(reason) => {
                            self.metrics.record_disconnect();
                            warn!(reason = reason.as_deref().unwrap_or(""), "channel closed");
                        }
                    }
                }
                Err(err) if err.is_auth_failure() => {
                    self.fail_auth(&token, &err.to_string());
                    return;
                }
                Err(err) => {
                    warn!("connect attempt failed: {}", err);
                }
            }

            self.set_state(ConnectionState::Disconnected);
            if retries >= self.config.reconnect_attempts {
                warn!(
                    attempts = self.config.reconnect_attempts,
                    "reconnection attempts exhausted"
                );
                return;
            }
            retries += 1;
            sleep(self.config.reconnect_delay).await;
        }
    }

    async fn run_channel(&self, channel: ChannelHandle) -> ChannelEnd {
        let ChannelHandle {
            outbound,
            mut inbound,
        } = channel;

        {
            let rooms = lock(&self.rooms);
            *lock(&self.outbound) = Some(outbound.clone());
            self.set_state(ConnectionState::Connected);
            self.metrics.record_connected();
            info!(rooms = rooms.len(), "real-time channel connected");

            for join in rooms.replay() {
                if let Err(e) = self.send_on(&outbound, &join) {
                    warn!("room replay failed: {}", e);
                }
            }
        }

        let period = self.config.heartbeat_interval;
        let mut heartbeat = interval_at(Instant::now() + period, period);

        let end = loop {
            tokio::select! {
                event = inbound.recv() => match event {
                    Some(TransportEvent::Frame(frame)) => {
                        self.metrics.record_frame_received();
                        if let Some(reason) = self.handle_frame(&frame) {
                            break ChannelEnd::AuthRejected(reason);
                        }
                    }
                    Some(TransportEvent::Closed(reason)) => break ChannelEnd::Closed(reason),
                    None => break ChannelEnd::Closed(None),
                },
                _ = heartbeat.tick() => {
                    if let Err(e) = self.send_on(&outbound, &ClientMessage::ping_now()) {
                        debug!("heartbeat not sent: {}", e);
                    }
                }
            }
        };

        *lock(&self.outbound) = None;
        end
    }

    /// Handles one inbound frame. Returns the reason if it rejects the credential.
    fn handle_frame(&self, frame: &str) -> Option<String> {
        let event = match InboundEvent::decode(frame) {
            Ok(event) => event,
            Err(e) => {
                self.metrics.record_dropped();
                warn!("dropping inbound frame: {}", e);
                return None;
            }
        };

        match event {
            InboundEvent::ConnectError(rejection) if is_auth_reason(&rejection.message) => {
                Some(rejection.message)
            }
            InboundEvent::ConnectError(rejection) => {
                warn!(reason = %rejection.message, "server reported connect error");
                None
            }
            InboundEvent::Pong { timestamp } => {
                debug!(timestamp, "pong");
                None
            }
            other => {
                if let Err(e) = self.router.route(other) {
                    debug!("event not routed: {}", e);
                }
                None
            }
        }
    }

    fn fail_auth(&self, token: &str, reason: &str) {
        error!(reason, "real-time channel rejected credential");
        *lock(&self.outbound) = None;
        *lock(&self.rejected_token) = Some(token.to_string());
        self.metrics.record_auth_failure();
        self.set_state(ConnectionState::AuthFailed);
        self.session.expire();
    }
}

/// A hold on the shared channel. Dropping the last lease disconnects.
pub struct ConnectionLease<T: Transport = WsTransport> {
    manager: ConnectionManager<T>,
}

impl<T: Transport> ConnectionLease<T> {
    /// Returns the leased manager.
    #[must_use]
    pub fn manager(&self) -> &ConnectionManager<T> {
        &self.manager
    }
}

impl<T: Transport> std::fmt::Debug for ConnectionLease<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionLease").finish_non_exhaustive()
    }
}

impl<T: Transport> Drop for ConnectionLease<T> {
    fn drop(&mut self) {
        self.manager.release();
    }
}
