//! In-Process Transport
//!
//! Channel-backed connector used when the notification source lives in the
//! same process, and by tests that need to script a server: push frames, drop
//! connections uncleanly, close them gracefully or refuse new connections.
//!
//! # Usage
//!
//! ```ignore
//! let (connector, mut server) = InProcessConnector::new_pair();
//!
//! // Hand `connector` to a NotificationChannel, then:
//! let conn = server.accept().await.unwrap();
//! conn.notify(&NotificationRecord::new("Saved")).await?;
//! conn.drop_connection().await; // the channel reconnects with backoff
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::frame;
use super::traits::{
    ConnectionHandle, Connector, Frame, TransportError, TransportEvent, EVENT_CHANNEL_CAPACITY,
};
use crate::messages::NotificationRecord;

/// Shared switches between a connector and its server
#[derive(Debug, Default)]
struct Shared {
    refuse: AtomicBool,
    attempts: AtomicUsize,
}

/// Client side: opens connections to the paired [`InProcessServer`]
#[derive(Clone, Debug)]
pub struct InProcessConnector {
    accept_tx: mpsc::UnboundedSender<InProcessConnection>,
    shared: Arc<Shared>,
}

/// Server side: accepts connections and scripts what they deliver
#[derive(Debug)]
pub struct InProcessServer {
    accept_rx: mpsc::UnboundedReceiver<InProcessConnection>,
    shared: Arc<Shared>,
}

/// Server view of one accepted connection
#[derive(Debug)]
pub struct InProcessConnection {
    endpoint: String,
    event_tx: mpsc::Sender<TransportEvent>,
}

impl InProcessConnector {
    /// Create a connected connector/server pair
    #[must_use]
    pub fn new_pair() -> (Self, InProcessServer) {
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());

        let connector = Self {
            accept_tx,
            shared: Arc::clone(&shared),
        };
        let server = InProcessServer { accept_rx, shared };

        (connector, server)
    }
}

#[async_trait]
impl Connector for InProcessConnector {
    async fn connect(&self, endpoint: &str) -> Result<ConnectionHandle, TransportError> {
        self.shared.attempts.fetch_add(1, Ordering::SeqCst);

        if self.shared.refuse.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionFailed(format!(
                "{endpoint} refused the connection"
            )));
        }

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (close_tx, close_rx) = oneshot::channel::<()>();

        // A local close completes immediately and cleanly
        let close_events = event_tx.clone();
        tokio::spawn(async move {
            if close_rx.await.is_ok() {
                let _ = close_events
                    .send(TransportEvent::Close { clean: true })
                    .await;
            }
        });

        let connection = InProcessConnection {
            endpoint: endpoint.to_string(),
            event_tx,
        };
        self.accept_tx
            .send(connection)
            .map_err(|_| TransportError::ConnectionFailed("server is gone".to_string()))?;

        Ok(ConnectionHandle::new(event_rx, close_tx))
    }
}

impl InProcessServer {
    /// Wait for the next connection
    ///
    /// Returns `None` once every connector has been dropped.
    pub async fn accept(&mut self) -> Option<InProcessConnection> {
        self.accept_rx.recv().await
    }

    /// Take an already pending connection without waiting
    pub fn try_accept(&mut self) -> Option<InProcessConnection> {
        self.accept_rx.try_recv().ok()
    }

    /// Refuse (or accept again) new connection attempts
    pub fn refuse_connections(&self, refuse: bool) {
        self.shared.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Number of connection attempts seen so far, refused ones included
    #[must_use]
    pub fn connection_attempts(&self) -> usize {
        self.shared.attempts.load(Ordering::SeqCst)
    }
}

impl InProcessConnection {
    /// Endpoint the client asked for
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Push a raw frame
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ConnectionClosed` if the client went away.
    pub async fn send_frame(&self, frame: Frame) -> Result<(), TransportError> {
        self.event_tx
            .send(TransportEvent::Message(frame))
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }

    /// Push a text frame
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ConnectionClosed` if the client went away.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), TransportError> {
        self.send_frame(Frame::Text(text.into())).await
    }

    /// Push a notification in the server's array form
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ConnectionClosed` if the client went away.
    pub async fn notify(&self, record: &NotificationRecord) -> Result<(), TransportError> {
        let payload = frame::encode(record)
            .map_err(|e| TransportError::ConnectionFailed(format!("encode failed: {e}")))?;
        self.send_text(payload).await
    }

    /// Terminate abnormally, as a network drop would
    pub async fn drop_connection(self) {
        let _ = self
            .event_tx
            .send(TransportEvent::Error("connection reset".to_string()))
            .await;
        let _ = self
            .event_tx
            .send(TransportEvent::Close { clean: false })
            .await;
    }

    /// Close gracefully from the server side
    pub async fn close(self) {
        let _ = self
            .event_tx
            .send(TransportEvent::Close { clean: true })
            .await;
    }

    /// Whether the client has released its end of the connection
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.event_tx.is_closed()
    }
}
