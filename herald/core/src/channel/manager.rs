//! Channel Manager
//!
//! The connection state machine behind the notification channel. It owns the
//! single logical connection's state, the reconnect backoff and the pending
//! reconnect timer flag, and it performs no I/O: every input is a
//! [`TransportEvent`] or a timer firing, every output is a list of
//! [`ChannelAction`]s for the runtime to execute.
//!
//! # State Machine
//!
//! ```text
//!                 connect()                 Open
//!  Disconnected ───────────▶ Connecting ───────────▶ Open
//!       ▲                        │                    │
//!       │   Close (clean)        │ close()            │ close() / shutdown()
//!       ├────────────────────────┼────────────────────┤
//!       │                        ▼                    ▼
//!       │                      Closing ◀──────────────┘
//!       │   Close                │
//!       └────────────────────────┘
//!
//!  Close (unclean) from Connecting/Open ──▶ Disconnected + ScheduleReconnect
//! ```
//!
//! # Invariants
//!
//! - At most one reconnect timer is pending at any time.
//! - No connection attempt is issued while `Connecting`, `Open` or `Closing`.
//! - Backoff resets on the first successfully decoded message, never on a bare
//!   transport open.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::backoff::Backoff;
use crate::config::ChannelConfig;
use crate::messages::NotificationRecord;
use crate::transport::frame;
use crate::transport::{Frame, TransportEvent};

/// Connection lifecycle states
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No connection and no attempt in flight
    #[default]
    Disconnected,
    /// A connection attempt is in flight
    Connecting,
    /// The connection is live
    Open,
    /// A local close is in progress
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
        };
        f.write_str(name)
    }
}

/// Work the runtime must carry out on behalf of the manager
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelAction {
    /// Open a connection to the endpoint
    OpenConnection {
        /// Where to connect
        endpoint: String,
    },
    /// Close the live connection (or abandon the attempt in flight)
    CloseConnection,
    /// Arm the reconnect timer
    ScheduleReconnect {
        /// How long to wait before reconnecting
        delay: Duration,
    },
    /// Disarm the reconnect timer
    CancelReconnect,
    /// Hand a decoded notification to the renderer
    Render(NotificationRecord),
}

/// Errors from channel operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// The operation is not allowed in the current state
    #[error("Operation not allowed while {0}")]
    InvalidState(ConnectionState),

    /// The channel has been shut down
    #[error("Channel has been shut down")]
    ShutDown,

    /// The runtime task is no longer running
    #[error("Channel task is gone")]
    TaskGone,
}

/// Counters describing what the channel has done so far
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStats {
    /// Connection attempts issued
    pub connects: u64,
    /// Notifications decoded and forwarded
    pub delivered: u64,
    /// Frames dropped because they could not be decoded
    pub dropped_frames: u64,
    /// Reconnects scheduled after unclean closes
    pub reconnects_scheduled: u64,
}

/// Sans-IO connection state machine
#[derive(Debug)]
pub struct ChannelManager {
    endpoint: String,
    state: ConnectionState,
    backoff: Backoff,
    reconnect_pending: bool,
    shut_down: bool,
    stats: ChannelStats,
}

impl ChannelManager {
    /// Create a manager for `endpoint`
    pub fn new(endpoint: impl Into<String>, backoff: Backoff) -> Self {
        Self {
            endpoint: endpoint.into(),
            state: ConnectionState::Disconnected,
            backoff,
            reconnect_pending: false,
            shut_down: false,
            stats: ChannelStats::default(),
        }
    }

    /// Create a manager from configuration
    #[must_use]
    pub fn from_config(config: &ChannelConfig) -> Self {
        Self::new(
            config.endpoint.clone(),
            Backoff::new(config.base_delay(), config.max_delay()),
        )
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Endpoint this manager connects to
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether a reconnect timer is armed
    #[must_use]
    pub fn is_reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// Whether `shutdown()` has been called
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Reconnect backoff
    #[must_use]
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Activity counters
    #[must_use]
    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    /// Start a connection attempt
    ///
    /// A pending reconnect timer is consumed by a manual connect, so the two
    /// never produce separate attempts.
    ///
    /// # Errors
    ///
    /// - `ChannelError::ShutDown` after [`shutdown`](Self::shutdown)
    /// - `ChannelError::InvalidState` unless `Disconnected`
    pub fn connect(&mut self) -> Result<Vec<ChannelAction>, ChannelError> {
        if self.shut_down {
            return Err(ChannelError::ShutDown);
        }
        if self.state != ConnectionState::Disconnected {
            return Err(ChannelError::InvalidState(self.state));
        }

        let mut actions = Vec::with_capacity(2);
        if self.reconnect_pending {
            self.reconnect_pending = false;
            actions.push(ChannelAction::CancelReconnect);
        }
        actions.push(self.begin_connect());
        Ok(actions)
    }

    /// The reconnect timer fired
    pub fn reconnect_timer_fired(&mut self) -> Vec<ChannelAction> {
        if !self.reconnect_pending {
            debug!("Ignoring stale reconnect timer");
            return Vec::new();
        }
        self.reconnect_pending = false;

        if self.shut_down || self.state != ConnectionState::Disconnected {
            return Vec::new();
        }

        vec![self.begin_connect()]
    }

    /// Feed a transport event
    pub fn handle(&mut self, event: TransportEvent) -> Vec<ChannelAction> {
        match event {
            TransportEvent::Open => {
                if self.state == ConnectionState::Connecting {
                    self.state = ConnectionState::Open;
                    info!(endpoint = %self.endpoint, "Connected");
                } else {
                    debug!(state = %self.state, "Ignoring open event");
                }
                Vec::new()
            }
            TransportEvent::Message(frame) => match self.state {
                ConnectionState::Open | ConnectionState::Closing => self.on_message(&frame),
                state => {
                    debug!(%state, bytes = frame.len(), "Ignoring frame outside a connection");
                    Vec::new()
                }
            },
            TransportEvent::Error(reason) => {
                debug!(%reason, state = %self.state, "Connection error");
                Vec::new()
            }
            TransportEvent::Close { clean } => self.on_close(clean),
        }
    }

    /// Close the connection locally without reconnecting
    ///
    /// Also disarms a pending reconnect timer.
    pub fn close(&mut self) -> Vec<ChannelAction> {
        match self.state {
            ConnectionState::Open | ConnectionState::Connecting => {
                self.state = ConnectionState::Closing;
                info!(endpoint = %self.endpoint, "Closing connection");
                vec![ChannelAction::CloseConnection]
            }
            ConnectionState::Disconnected if self.reconnect_pending => {
                self.reconnect_pending = false;
                vec![ChannelAction::CancelReconnect]
            }
            ConnectionState::Disconnected | ConnectionState::Closing => Vec::new(),
        }
    }

    /// Stop for good: disarm the timer, close the connection
    ///
    /// Idempotent; later `connect()` calls fail with `ChannelError::ShutDown`.
    pub fn shutdown(&mut self) -> Vec<ChannelAction> {
        if self.shut_down {
            return Vec::new();
        }
        self.shut_down = true;
        info!(endpoint = %self.endpoint, "Shutting down channel");

        // A pending reconnect only exists while disconnected, where close() disarms it
        self.close()
    }

    fn begin_connect(&mut self) -> ChannelAction {
        self.state = ConnectionState::Connecting;
        self.stats.connects += 1;
        info!(endpoint = %self.endpoint, attempt = self.stats.connects, "Connecting");
        ChannelAction::OpenConnection {
            endpoint: self.endpoint.clone(),
        }
    }

    fn on_message(&mut self, frame: &Frame) -> Vec<ChannelAction> {
        match frame::decode(frame) {
            Ok(record) => {
                // A decoded message proves the connection is healthy
                self.backoff.reset();
                self.stats.delivered += 1;
                debug!(message = %record.message, level = ?record.level(), "Decoded notification");
                vec![ChannelAction::Render(record)]
            }
            Err(e) => {
                self.stats.dropped_frames += 1;
                debug!(error = %e, bytes = frame.len(), "Dropping undecodable frame");
                Vec::new()
            }
        }
    }

    fn on_close(&mut self, clean: bool) -> Vec<ChannelAction> {
        let previous = self.state;
        if previous == ConnectionState::Disconnected {
            debug!(clean, "Ignoring close while disconnected");
            return Vec::new();
        }

        self.state = ConnectionState::Disconnected;

        // A close we asked for is clean whatever the wire said
        let clean = clean || previous == ConnectionState::Closing;
        if clean || self.shut_down {
            info!(endpoint = %self.endpoint, clean, "Disconnected");
            return Vec::new();
        }

        if self.reconnect_pending {
            return Vec::new();
        }

        let delay = self.backoff.next_delay();
        self.reconnect_pending = true;
        self.stats.reconnects_scheduled += 1;
        warn!(
            endpoint = %self.endpoint,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Connection lost, scheduling reconnect"
        );
        vec![ChannelAction::ScheduleReconnect { delay }]
    }
}
