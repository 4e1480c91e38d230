//! Channel Runtime
//!
//! Runs a [`ChannelManager`] against a real [`Connector`] and a
//! [`NotificationSink`]. One tokio task owns the manager, the live connection,
//! the connection attempt in flight and the reconnect deadline, and
//! `select!`s over them alongside commands from the [`NotificationChannel`]
//! handle.
//!
//! ```text
//!  NotificationChannel ──Command──▶ ┌──────────────┐ ──connect()──▶ Connector
//!        ▲                          │ channel task │ ◀──events───── ConnectionHandle
//!        └──watch<ConnectionState>──│  (manager)   │ ──deliver()──▶ NotificationSink
//!                                   └──────────────┘
//! ```

use std::future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::manager::{ChannelAction, ChannelError, ChannelManager, ChannelStats, ConnectionState};
use crate::config::ChannelConfig;
use crate::render::NotificationSink;
use crate::transport::{ConnectionHandle, Connector, TransportError, TransportEvent};

/// Command queue depth between the handle and the task
const COMMAND_CHANNEL_CAPACITY: usize = 32;

type PendingConnect = BoxFuture<'static, Result<ConnectionHandle, TransportError>>;

enum Command {
    Connect(oneshot::Sender<Result<(), ChannelError>>),
    Disconnect(oneshot::Sender<()>),
    Stats(oneshot::Sender<ChannelStats>),
    Shutdown,
}

/// Handle to a running notification channel
///
/// Dropping the handle shuts the channel down in the background; call
/// [`shutdown`](Self::shutdown) to wait for it.
#[derive(Debug)]
pub struct NotificationChannel {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<ChannelStats>,
}

impl NotificationChannel {
    /// Start the channel task
    ///
    /// The channel starts `Disconnected`; call [`connect`](Self::connect) to
    /// open the first connection. Must be called from within a tokio runtime.
    pub fn spawn<C, S>(config: &ChannelConfig, connector: C, sink: S) -> Self
    where
        C: Connector,
        S: NotificationSink,
    {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let task = ChannelTask {
            manager: ChannelManager::from_config(config),
            connector: Arc::new(connector),
            sink,
            connect_timeout: config.connect_timeout(),
            connection: None,
            pending_connect: None,
            reconnect_at: None,
            state_tx,
        };

        Self {
            commands: command_tx,
            state: state_rx,
            task: tokio::spawn(task.run(command_rx)),
        }
    }

    /// Open the connection
    ///
    /// Returns once the attempt has been issued, not once it is open; use
    /// [`wait_for_state`](Self::wait_for_state) to wait for `Open`.
    ///
    /// # Errors
    ///
    /// - `ChannelError::InvalidState` unless the channel is disconnected
    /// - `ChannelError::ShutDown` / `ChannelError::TaskGone` once stopped
    pub async fn connect(&self) -> Result<(), ChannelError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Connect(reply_tx)).await?;
        reply_rx.await.map_err(|_| ChannelError::TaskGone)?
    }

    /// Close the connection without reconnecting
    ///
    /// The channel can be connected again afterwards.
    ///
    /// # Errors
    ///
    /// `ChannelError::TaskGone` if the task has stopped.
    pub async fn disconnect(&self) -> Result<(), ChannelError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Disconnect(reply_tx)).await?;
        reply_rx.await.map_err(|_| ChannelError::TaskGone)
    }

    /// Activity counters so far
    ///
    /// # Errors
    ///
    /// `ChannelError::TaskGone` if the task has stopped.
    pub async fn stats(&self) -> Result<ChannelStats, ChannelError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Stats(reply_tx)).await?;
        reply_rx.await.map_err(|_| ChannelError::TaskGone)
    }

    /// Current connection state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch connection state changes
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Wait until the channel reaches `target`
    ///
    /// # Errors
    ///
    /// `ChannelError::TaskGone` if the task stops first.
    pub async fn wait_for_state(&self, target: ConnectionState) -> Result<(), ChannelError> {
        let mut state = self.state.clone();
        state
            .wait_for(|s| *s == target)
            .await
            .map(|_| ())
            .map_err(|_| ChannelError::TaskGone)
    }

    /// Stop the channel
    ///
    /// Cancels a pending reconnect, closes the live connection (waiting up to
    /// the connect timeout for it to finish) and ends the task.
    ///
    /// # Errors
    ///
    /// `ChannelError::TaskGone` if the task had already died.
    pub async fn shutdown(self) -> Result<ChannelStats, ChannelError> {
        // A closed queue means the task is already on its way out
        let _ = self.commands.send(Command::Shutdown).await;
        self.task.await.map_err(|_| ChannelError::TaskGone)
    }

    async fn send(&self, command: Command) -> Result<(), ChannelError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ChannelError::TaskGone)
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Connect(_) => "Connect",
            Self::Disconnect(_) => "Disconnect",
            Self::Stats(_) => "Stats",
            Self::Shutdown => "Shutdown",
        };
        f.write_str(name)
    }
}

struct ChannelTask<C, S> {
    manager: ChannelManager,
    connector: Arc<C>,
    sink: S,
    connect_timeout: Duration,
    connection: Option<ConnectionHandle>,
    pending_connect: Option<PendingConnect>,
    reconnect_at: Option<Instant>,
    state_tx: watch::Sender<ConnectionState>,
}

impl<C: Connector, S: NotificationSink> ChannelTask<C, S> {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> ChannelStats {
        debug!(endpoint = %self.manager.endpoint(), "Channel task started");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Connect(reply)) => {
                        let result = match self.manager.connect() {
                            Ok(actions) => {
                                self.execute(actions);
                                Ok(())
                            }
                            Err(e) => Err(e),
                        };
                        let _ = reply.send(result);
                    }
                    Some(Command::Disconnect(reply)) => {
                        let actions = self.manager.close();
                        self.execute(actions);
                        let _ = reply.send(());
                    }
                    Some(Command::Stats(reply)) => {
                        let _ = reply.send(self.manager.stats());
                    }
                    Some(Command::Shutdown) | None => break,
                },

                result = await_connect(&mut self.pending_connect) => {
                    self.pending_connect = None;
                    self.on_connect_result(result);
                }

                event = next_event(&mut self.connection) => match event {
                    Some(event) => self.on_transport_event(event),
                    None => {
                        self.connection = None;
                        self.feed(TransportEvent::Error("transport task ended".to_string()));
                        self.feed(TransportEvent::Close { clean: false });
                    }
                },

                () = reconnect_deadline(self.reconnect_at) => {
                    self.reconnect_at = None;
                    let actions = self.manager.reconnect_timer_fired();
                    self.execute(actions);
                }
            }
        }

        self.shutdown().await;
        let stats = self.manager.stats();
        info!(
            endpoint = %self.manager.endpoint(),
            delivered = stats.delivered,
            connects = stats.connects,
            "Channel task stopped"
        );
        stats
    }

    async fn shutdown(&mut self) {
        let actions = self.manager.shutdown();
        self.execute(actions);

        let deadline = Instant::now() + self.connect_timeout;
        while let Some(connection) = self.connection.as_mut() {
            let next = tokio::time::timeout_at(deadline, connection.next_event()).await;
            match next {
                Ok(Some(event)) => self.on_transport_event(event),
                Ok(None) => {
                    self.connection = None;
                    self.feed(TransportEvent::Close { clean: false });
                }
                Err(_) => {
                    warn!("Timed out waiting for the connection to close");
                    self.connection = None;
                    self.feed(TransportEvent::Close { clean: false });
                }
            }
        }
    }

    fn on_connect_result(&mut self, result: Result<ConnectionHandle, TransportError>) {
        match result {
            Ok(handle) => {
                self.connection = Some(handle);
                self.feed(TransportEvent::Open);
            }
            Err(e) => {
                warn!(endpoint = %self.manager.endpoint(), error = %e, "Connection attempt failed");
                self.feed(TransportEvent::Error(e.to_string()));
                self.feed(TransportEvent::Close { clean: false });
            }
        }
    }

    fn on_transport_event(&mut self, event: TransportEvent) {
        if matches!(event, TransportEvent::Close { .. }) {
            self.connection = None;
        }
        self.feed(event);
    }

    fn feed(&mut self, event: TransportEvent) {
        let actions = self.manager.handle(event);
        self.execute(actions);
    }

    fn execute(&mut self, actions: Vec<ChannelAction>) {
        for action in actions {
            match action {
                ChannelAction::OpenConnection { endpoint } => self.start_connect(endpoint),
                ChannelAction::CloseConnection => {
                    if let Some(connection) = self.connection.as_mut() {
                        if !connection.close() {
                            debug!("Close already requested");
                        }
                    } else if self.pending_connect.take().is_some() {
                        debug!("Abandoning connection attempt");
                        self.feed(TransportEvent::Close { clean: true });
                    }
                }
                ChannelAction::ScheduleReconnect { delay } => {
                    self.reconnect_at = Some(Instant::now() + delay);
                }
                ChannelAction::CancelReconnect => {
                    self.reconnect_at = None;
                }
                ChannelAction::Render(record) => self.sink.deliver(record),
            }
        }
        self.publish_state();
    }

    fn start_connect(&mut self, endpoint: String) {
        let connector = Arc::clone(&self.connector);
        let timeout = self.connect_timeout;

        self.pending_connect = Some(Box::pin(async move {
            match tokio::time::timeout(timeout, connector.connect(&endpoint)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(
                    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                )),
            }
        }));
    }

    fn publish_state(&self) {
        let state = self.manager.state();
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                debug!(from = %current, to = %state, "State changed");
                *current = state;
                true
            }
        });
    }
}

async fn await_connect(
    pending: &mut Option<PendingConnect>,
) -> Result<ConnectionHandle, TransportError> {
    match pending {
        Some(connect) => connect.await,
        None => future::pending().await,
    }
}

async fn next_event(connection: &mut Option<ConnectionHandle>) -> Option<TransportEvent> {
    match connection {
        Some(connection) => connection.next_event().await,
        None => future::pending().await,
    }
}

async fn reconnect_deadline(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => future::pending().await,
    }
}
