//! WebSocket Transport
//!
//! Connector for the server's `/notifications` WebSocket endpoint, built on
//! `tokio-tungstenite`. Each connection gets a pump task that turns the
//! socket's frames into [`TransportEvent`]s and performs the closing
//! handshake when the handle asks for a local close.
//!
//! # Close Semantics
//!
//! | Wire outcome                          | Reported event              |
//! |---------------------------------------|-----------------------------|
//! | Close frame received from the server  | `Close { clean: true }`     |
//! | Local close handshake                 | `Close { clean: true }`     |
//! | Socket error / EOF without close frame| `Error` + `Close { clean: false }` |
//!
//! `wss://` endpoints need the `tls` feature.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use super::traits::{
    ConnectionHandle, Connector, Frame, TransportError, TransportEvent, EVENT_CHANNEL_CAPACITY,
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens WebSocket connections
#[derive(Clone, Debug, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Create a connector
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, endpoint: &str) -> Result<ConnectionHandle, TransportError> {
        let request =
            endpoint
                .into_client_request()
                .map_err(|e| TransportError::InvalidEndpoint {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })?;

        let (socket, response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| TransportError::ConnectionFailed(format!("{endpoint}: {e}")))?;

        debug!(endpoint, status = %response.status(), "WebSocket handshake complete");

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (close_tx, close_rx) = oneshot::channel();
        tokio::spawn(pump(socket, event_tx, close_rx));

        Ok(ConnectionHandle::new(event_rx, close_tx))
    }
}

/// Forward socket frames as events until the connection ends
async fn pump(
    mut socket: Socket,
    events: mpsc::Sender<TransportEvent>,
    mut close_rx: oneshot::Receiver<()>,
) {
    let mut closing = false;

    loop {
        tokio::select! {
            request = &mut close_rx, if !closing => {
                closing = true;
                if request.is_err() {
                    // Handle dropped: nobody is listening any more
                    trace!("Connection handle dropped, abandoning socket");
                    return;
                }

                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: "client closing".into(),
                };
                if let Err(e) = socket.close(Some(frame)).await {
                    debug!(error = %e, "Close handshake failed");
                    let _ = events.send(TransportEvent::Close { clean: true }).await;
                    return;
                }
            }

            next = socket.next() => {
                let event = match next {
                    Some(Ok(Message::Text(text))) => TransportEvent::Message(Frame::Text(text)),
                    Some(Ok(Message::Binary(data))) => TransportEvent::Message(Frame::Binary(data)),
                    Some(Ok(Message::Close(frame))) => {
                        debug!(
                            code = ?frame.as_ref().map(|f| f.code),
                            reason = ?frame.as_ref().map(|f| f.reason.to_string()),
                            "Close frame received"
                        );
                        let _ = events.send(TransportEvent::Close { clean: true }).await;
                        return;
                    }
                    // Pongs are queued by tungstenite itself
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                    Some(Err(e)) => {
                        if !closing {
                            let _ = events.send(TransportEvent::Error(e.to_string())).await;
                        }
                        let _ = events.send(TransportEvent::Close { clean: closing }).await;
                        return;
                    }
                    None => {
                        if !closing {
                            let _ = events
                                .send(TransportEvent::Error(
                                    "stream ended without close frame".to_string(),
                                ))
                                .await;
                        }
                        let _ = events.send(TransportEvent::Close { clean: closing }).await;
                        return;
                    }
                };

                if events.send(event).await.is_err() {
                    trace!("Event receiver dropped, abandoning socket");
                    return;
                }
            }
        }
    }
}
