//! Herald Core - Real-Time Notifications for Server-Rendered Pages
//!
//! This crate keeps one persistent connection open to a server's
//! `/notifications` endpoint, decodes the notification records pushed over it
//! and shows each one as a toast. Lost connections are re-established with
//! exponential backoff; a clean close from either side is final.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                       Notification Server                       │
//! │                  ws(s)://<host>/notifications                   │
//! └───────────────────────────────┬────────────────────────────────┘
//!                                 │ frames: ["msg", {level, icon, ...}]
//! ┌───────────────────────────────┼────────────────────────────────┐
//! │  transport                    ▼                                 │
//! │  ┌──────────────────┐  ┌──────────────────┐                     │
//! │  │ WebSocket        │  │ InProcess        │  Connector trait    │
//! │  └────────┬─────────┘  └────────┬─────────┘                     │
//! │           └──────────┬──────────┘                               │
//! │                      │ TransportEvent                            │
//! │  channel             ▼                                          │
//! │  ┌────────────────────────────────────┐                         │
//! │  │ NotificationChannel (tokio task)   │                         │
//! │  │   ChannelManager  +  Backoff       │                         │
//! │  └──────────────────┬─────────────────┘                         │
//! │                     │ NotificationRecord                        │
//! │  render             ▼                                           │
//! │  ┌────────────────────────────────────┐                         │
//! │  │ ToastRenderer ──▶ ToastContainer   │  NotificationSink trait │
//! │  └────────────────────────────────────┘                         │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use herald_core::{
//!     load_config, NotificationChannel, ToastContainer, ToastRenderer, ToastTemplate,
//!     WebSocketConnector,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?.channel;
//!
//!     let renderer = ToastRenderer::builder()
//!         .template(ToastTemplate::new())
//!         .container(ToastContainer::shared())
//!         .autohide_delay(config.autohide())
//!         .build()?;
//!
//!     let channel = NotificationChannel::spawn(&config, WebSocketConnector::new(), renderer);
//!     channel.connect().await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     channel.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`channel`]: Connection state machine, backoff and the async runtime
//! - [`config`]: Layered configuration (CLI, environment, TOML, defaults)
//! - [`messages`]: Notification records and their options
//! - [`render`]: Toast templates, the shared container and the renderer
//! - [`transport`]: Wire codec and connectors (WebSocket, in-process)

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channel;
pub mod config;
pub mod messages;
pub mod render;
pub mod transport;

// Re-exports for convenience
pub use channel::{
    Backoff, ChannelAction, ChannelError, ChannelManager, ChannelStats, ConnectionState,
    NotificationChannel,
};
pub use messages::{NotificationRecord, NotifyOptions};
pub use render::{
    NotificationSink, RenderError, SharedContainer, Toast, ToastContainer, ToastElement, ToastId,
    ToastRenderer, ToastRendererBuilder, ToastTemplate, Visibility,
};
pub use transport::{
    ConnectionHandle, Connector, DecodeError, Frame, InProcessConnector, InProcessServer,
    TransportError, TransportEvent, WebSocketConnector,
};

// Config exports
pub use config::{
    default_config_path, endpoint_from_base, load_config, load_config_from_path,
    load_config_layers, ChannelConfig, ConfigError, ConfigSource, HeraldToml, LoadedConfig,
};
