//! Notification Channel
//!
//! The persistent, self-healing connection to the server's notification
//! endpoint.
//!
//! - `manager` - sans-IO connection state machine
//! - `backoff` - exponential reconnect delay
//! - `runtime` - tokio task driving the manager against a real transport

pub mod backoff;
pub mod manager;
pub mod runtime;

pub use backoff::Backoff;
pub use manager::{ChannelAction, ChannelError, ChannelManager, ChannelStats, ConnectionState};
pub use runtime::NotificationChannel;
