//! Transport Layer for Push Notifications
//!
//! Provides abstraction over the mechanisms that carry notification frames:
//! - `WebSocket`: the server's `/notifications` endpoint
//! - `InProcess`: channel-backed connections for embedding and tests
//!
//! # Design Philosophy
//!
//! Transports only report what happened on the wire as [`TransportEvent`]s.
//! Deciding whether to reconnect, and when, belongs to the channel manager,
//! so every transport gets the same backoff behavior for free.

pub mod frame;
pub mod in_process;
pub mod traits;
pub mod websocket;

// Re-exports for convenience
pub use frame::{decode, decode_str, encode, DecodeError, MAX_FRAME_SIZE};
pub use in_process::{InProcessConnection, InProcessConnector, InProcessServer};
pub use traits::{ConnectionHandle, Connector, Frame, TransportError, TransportEvent};
pub use websocket::WebSocketConnector;
