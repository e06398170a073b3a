//! Channel transport.
//!
//! A [`Transport`] opens one bidirectional text channel. The connection
//! manager only ever sees the queue pair in [`ChannelHandle`], so the socket
//! implementation can be swapped out in tests.

use std::future::Future;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use super::error::WsError;

/// Event surfaced by an open channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame.
    Frame(String),
    /// The channel closed, with the peer's reason if any.
    Closed(Option<String>),
}

/// Queue pair for one open channel.
#[derive(Debug)]
pub struct ChannelHandle {
    /// Frames to send to the server.
    pub outbound: mpsc::Sender<String>,
    /// Frames and lifecycle events from the server.
    pub inbound: mpsc::Receiver<TransportEvent>,
}

/// Opens channels to the real-time server.
pub trait Transport: Send + Sync + 'static {
    /// Opens a channel to `url`.
    ///
    /// Authentication-class rejections must surface as errors for which
    /// [`WsError::is_auth_failure`] returns true.
    fn open(&self, url: &str) -> impl Future<Output = Result<ChannelHandle, WsError>> + Send;
}

/// WebSocket transport.
#[derive(Debug, Clone)]
pub struct WsTransport {
    queue_capacity: usize,
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new(super::config::DEFAULT_OUTBOUND_CAPACITY)
    }
}

impl WsTransport {
    /// Creates a transport whose per-channel queues hold `queue_capacity` frames.
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue_capacity: queue_capacity.max(1),
        }
    }
}

impl Transport for WsTransport {
    async fn open(&self, url: &str) -> Result<ChannelHandle, WsError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(WsError::from)?;

        let (mut sink, mut source) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(self.queue_capacity);
        let (inbound_tx, inbound_rx) = mpsc::channel(self.queue_capacity);

        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(e) = sink.send(Message::Text(frame.into())).await {
                    debug!("writer stopped: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            let reason = loop {
                match source.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if inbound_tx
                            .send(TransportEvent::Frame(text.as_str().to_string()))
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break frame.map(|f| f.reason.as_str().to_string());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Some(e.to_string()),
                    None => break None,
                }
            };
            let _ = inbound_tx.send(TransportEvent::Closed(reason)).await;
        });

        Ok(ChannelHandle {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_transport_capacity_floor() {
        let transport = WsTransport::new(0);
        assert_eq!(transport.queue_capacity, 1);
    }

    #[tokio::test]
    async fn test_ws_transport_refused() {
        let transport = WsTransport::default();
        let result = transport.open("ws://127.0.0.1:9/unreachable").await;
        match result {
            Err(err) => assert!(!err.is_auth_failure()),
            Ok(_) => panic!("connection to a closed port should fail"),
        }
    }
}
