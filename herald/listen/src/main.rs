//! Herald Listen
//!
//! Headless surface for a notification endpoint: keeps the channel open,
//! prints every toast to the terminal and logs when it is dismissed.
//!
//! # Usage
//!
//! ```bash
//! # Local development server (ws://127.0.0.1:5000/notifications)
//! herald-listen
//!
//! # Derive the endpoint from the site URL
//! herald-listen --base-url https://fairplay.example.com
//!
//! # Show flashed messages first, as a page load would
//! herald-listen --flash success:"Player created"
//!
//! # With verbose logging
//! RUST_LOG=debug herald-listen
//! ```
//!
//! # Environment Variables
//!
//! - `HERALD_CONFIG`: configuration file path
//! - `HERALD_ENDPOINT`, `HERALD_BASE_DELAY_MS`, `HERALD_MAX_DELAY_MS`,
//!   `HERALD_CONNECT_TIMEOUT_MS`, `HERALD_AUTOHIDE_MS`: see the config file
//! - `RUST_LOG`: Log filter (trace, debug, info, warn, error)
//!
//! # Signals
//!
//! - SIGINT: Graceful shutdown (closes the connection cleanly)

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use herald_core::{
    default_config_path, endpoint_from_base, load_config_layers, ChannelConfig, ConfigSource,
    LoadedConfig, NotificationChannel, NotificationRecord, NotificationSink, ToastContainer,
    ToastRenderer, ToastTemplate, WebSocketConnector,
};

/// How often transient toasts are checked for expiry
const DISMISS_TICK: Duration = Duration::from_millis(250);

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "herald-listen")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Notification endpoint (ws:// or wss://)
    #[arg(short = 'e', long, value_name = "URL", conflicts_with = "base_url")]
    endpoint: Option<String>,

    /// Site URL to derive the endpoint from (http(s):// or ws(s)://)
    #[arg(short = 'b', long, value_name = "URL")]
    base_url: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "HERALD_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// First reconnect delay in milliseconds
    #[arg(long, value_name = "MS")]
    base_delay_ms: Option<u64>,

    /// Reconnect delay ceiling in milliseconds
    #[arg(long, value_name = "MS")]
    max_delay_ms: Option<u64>,

    /// Connection attempt timeout in milliseconds
    #[arg(long, value_name = "MS")]
    connect_timeout_ms: Option<u64>,

    /// How long transient toasts stay visible in milliseconds
    #[arg(long, value_name = "MS")]
    autohide_ms: Option<u64>,

    /// Flashed message to show on startup, as CATEGORY:MESSAGE
    #[arg(long = "flash", value_name = "CATEGORY:MESSAGE", value_parser = parse_flash)]
    flashed: Vec<(String, String)>,
}

impl Args {
    /// Apply CLI values over the loaded configuration
    fn apply(&self, loaded: &mut LoadedConfig) -> anyhow::Result<()> {
        let channel = &mut loaded.channel;
        let mut overridden = false;

        if let Some(endpoint) = &self.endpoint {
            channel.endpoint.clone_from(endpoint);
            overridden = true;
        } else if let Some(base) = &self.base_url {
            channel.endpoint = endpoint_from_base(base)?;
            overridden = true;
        }

        let delays = [
            (self.base_delay_ms, &mut channel.base_delay_ms),
            (self.max_delay_ms, &mut channel.max_delay_ms),
            (self.connect_timeout_ms, &mut channel.connect_timeout_ms),
            (self.autohide_ms, &mut channel.autohide_ms),
        ];
        for (value, slot) in delays {
            if let Some(value) = value {
                *slot = value;
                overridden = true;
            }
        }

        if overridden {
            loaded.source = ConfigSource::Cli;
        }
        channel.validate()?;
        Ok(())
    }
}

fn parse_flash(raw: &str) -> Result<(String, String), String> {
    match raw.split_once(':') {
        Some((category, message)) if !message.is_empty() => {
            Ok((category.to_string(), message.to_string()))
        }
        _ => Err(format!("expected CATEGORY:MESSAGE, got {raw:?}")),
    }
}

/// Renders each notification and echoes it to stdout
struct TerminalSink {
    renderer: ToastRenderer,
}

impl TerminalSink {
    /// Render `record` and return the line describing the new toast
    fn show(&self, record: &NotificationRecord) -> String {
        let id = self.renderer.render(record);
        format_toast(record, &id.to_string())
    }
}

impl NotificationSink for TerminalSink {
    fn deliver(&self, record: NotificationRecord) {
        println!("{}", self.show(&record));
    }
}

fn format_toast(record: &NotificationRecord, id: &str) -> String {
    let mut line = format!("[{id}]");
    if let Some(level) = record.level() {
        line.push_str(&format!(" {}", level.to_uppercase()));
    }
    if let Some(icon) = record.icon() {
        line.push_str(&format!(" ({icon})"));
    }
    line.push(' ');
    if let Some(title) = record.title() {
        line.push_str(&format!("{title}: "));
    }
    line.push_str(&record.message);
    if record.is_sticky() {
        line.push_str(" [sticky]");
    }
    line
}

/// File, environment and CLI layers merged, then validated once
fn load(args: &Args, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<LoadedConfig> {
    let path = args.config.clone().or_else(default_config_path);
    let mut loaded =
        load_config_layers(path.as_deref(), env).context("Failed to load configuration")?;

    args.apply(&mut loaded)?;
    Ok(loaded)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("herald_listen=info".parse()?)
                .add_directive("herald_core=info".parse()?),
        )
        .with_target(true)
        .init();

    let loaded = load(&args, |key| std::env::var(key).ok())?;
    let config: ChannelConfig = loaded.channel;
    info!(
        endpoint = %config.endpoint,
        source = %loaded.source,
        file = ?loaded.config_file_path,
        "Configuration loaded"
    );

    let renderer = ToastRenderer::builder()
        .template(ToastTemplate::new())
        .container(ToastContainer::shared())
        .autohide_delay(config.autohide())
        .build()?;

    let sink = TerminalSink {
        renderer: renderer.clone(),
    };

    // Flashed messages are shown like any pushed notification
    for (category, message) in &args.flashed {
        sink.deliver(NotificationRecord::from_flash(category, message.clone()));
    }

    let channel = NotificationChannel::spawn(&config, WebSocketConnector::new(), sink);
    channel.connect().await?;

    // Dismiss transient toasts as their delay elapses
    let dismisser = renderer.clone();
    let dismiss_task = tokio::spawn(async move {
        let mut tick = tokio::time::interval(DISMISS_TICK);
        loop {
            tick.tick().await;
            for toast in dismisser.expire_due(Instant::now()) {
                info!(id = %toast.id(), message = %toast.element(), "Toast dismissed");
            }
        }
    });

    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutting down");

    dismiss_task.abort();
    let stats = channel.shutdown().await?;
    info!(
        delivered = stats.delivered,
        dropped = stats.dropped_frames,
        connects = stats.connects,
        "Channel stopped"
    );

    Ok(())
}
