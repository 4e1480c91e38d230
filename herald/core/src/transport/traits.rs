//! Transport Traits
//!
//! Core definitions shared by every transport: the events a live connection
//! reports, the handle the channel runtime holds, and the `Connector` trait
//! that opens connections.
//!
//! Transports never decide about reconnection. They only report what the
//! wire did; the channel manager turns those events into state transitions.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Capacity of the per-connection event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Errors that can occur while opening or using a connection
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection to the endpoint failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection attempt did not complete in time
    #[error("Connection timed out after {0}ms")]
    Timeout(u64),

    /// Connection was closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Endpoint could not be turned into a request
    #[error("Invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint {
        /// The endpoint that was rejected
        endpoint: String,
        /// Why it was rejected
        reason: String,
    },
}

/// A raw inbound frame, before decoding
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame
    Text(String),
    /// Binary frame (expected to carry UTF-8 JSON)
    Binary(Vec<u8>),
}

impl Frame {
    /// Size of the payload in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(data) => data.len(),
        }
    }

    /// Whether the payload is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Transport-level events, in the order the wire produced them
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established
    Open,
    /// A frame arrived
    Message(Frame),
    /// The transport observed an error; a `Close` follows
    Error(String),
    /// The connection ended
    Close {
        /// Whether the close was expected (local or graceful server close)
        clean: bool,
    },
}

/// Handle to one live connection
///
/// Owns the receiving side of the connection's event stream and the signal
/// used to request a local close. Dropping the handle abandons the connection.
#[derive(Debug)]
pub struct ConnectionHandle {
    events: mpsc::Receiver<TransportEvent>,
    close_tx: Option<oneshot::Sender<()>>,
}

impl ConnectionHandle {
    /// Create a handle from an event stream and a close signal
    #[must_use]
    pub fn new(events: mpsc::Receiver<TransportEvent>, close_tx: oneshot::Sender<()>) -> Self {
        Self {
            events,
            close_tx: Some(close_tx),
        }
    }

    /// Wait for the next event
    ///
    /// Returns `None` once the transport task has gone away without
    /// reporting a close.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    /// Request a graceful local close
    ///
    /// Returns `false` if a close was already requested or the transport has
    /// already stopped listening for one.
    pub fn close(&mut self) -> bool {
        match self.close_tx.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Whether a close has been requested on this handle
    #[must_use]
    pub fn close_requested(&self) -> bool {
        self.close_tx.is_none()
    }
}

/// Opens connections to a notification endpoint
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a connection
    ///
    /// Success means the transport is open; the caller reports
    /// [`TransportEvent::Open`] itself.
    async fn connect(&self, endpoint: &str) -> Result<ConnectionHandle, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_len() {
        assert_eq!(Frame::Text("abc".into()).len(), 3);
        assert!(Frame::Binary(Vec::new()).is_empty());
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError::ConnectionFailed("refused".to_string());
        assert!(err.to_string().contains("refused"));

        let err = TransportError::Timeout(5000);
        assert!(err.to_string().contains("5000ms"));
    }

    #[tokio::test]
    async fn test_handle_close_only_once() {
        let (_event_tx, event_rx) = mpsc::channel(4);
        let (close_tx, close_rx) = oneshot::channel();
        let mut handle = ConnectionHandle::new(event_rx, close_tx);

        assert!(!handle.close_requested());
        assert!(handle.close());
        assert!(handle.close_requested());
        assert!(!handle.close());
        assert!(close_rx.await.is_ok());
    }

    #[tokio::test]
    async fn test_handle_yields_events_in_order() {
        let (event_tx, event_rx) = mpsc::channel(4);
        let (close_tx, _close_rx) = oneshot::channel();
        let mut handle = ConnectionHandle::new(event_rx, close_tx);

        event_tx
            .send(TransportEvent::Message(Frame::Text("one".into())))
            .await
            .unwrap();
        event_tx
            .send(TransportEvent::Close { clean: true })
            .await
            .unwrap();
        drop(event_tx);

        assert_eq!(
            handle.next_event().await,
            Some(TransportEvent::Message(Frame::Text("one".into())))
        );
        assert_eq!(
            handle.next_event().await,
            Some(TransportEvent::Close { clean: true })
        );
        assert_eq!(handle.next_event().await, None);
    }

    #[test]
    fn test_next_event_waits_for_transport() {
        let (event_tx, event_rx) = mpsc::channel(4);
        let (close_tx, _close_rx) = oneshot::channel();
        let mut handle = ConnectionHandle::new(event_rx, close_tx);

        let mut next = tokio_test::task::spawn(handle.next_event());
        tokio_test::assert_pending!(next.poll());

        event_tx.try_send(TransportEvent::Open).unwrap();
        assert!(next.is_woken());
        tokio_test::assert_ready_eq!(next.poll(), Some(TransportEvent::Open));
    }
}
