//! NotifyHub Client: real-time notification session
//!
//! Connects to a NotifyHub server, keeps the session's notification store
//! in sync and logs what arrives until Ctrl-C.

use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{fmt, EnvFilter};

use notifyhub_core::config::ClientConfig;
use notifyhub_core::error::AppError;
use notifyhub_core::types::UserId;
use notifyhub_realtime::notification::{NotificationPreferences, StoreEvent};
use notifyhub_realtime::{NotificationCenter, NotificationStore, TransportConnection};

/// NotifyHub real-time notification client
#[derive(Parser, Debug)]
#[command(name = "notifyhub-client", version, about)]
struct Cli {
    /// Configuration environment (loads config/<env>.toml)
    #[arg(long, default_value = "development", env = "NOTIFYHUB_ENV")]
    env: String,

    /// WebSocket endpoint, overrides transport.url
    #[arg(long)]
    url: Option<String>,

    /// Bearer token appended to the endpoint
    #[arg(long, env = "NOTIFYHUB_TOKEN")]
    token: Option<String>,

    /// Session user; a random one is generated when omitted
    #[arg(long)]
    user_id: Option<UserId>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_configuration(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config, cli.user_id.unwrap_or_default()).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from files and environment, then apply flags
fn load_configuration(cli: &Cli) -> Result<ClientConfig, AppError> {
    let mut overrides = Vec::new();
    if let Some(url) = &cli.url {
        overrides.push(("transport.url", url.clone()));
    }
    if let Some(token) = &cli.token {
        overrides.push(("transport.token", token.clone()));
    }
    ClientConfig::load_with_overrides(&cli.env, &overrides)
}

/// Initialize tracing/logging
fn init_logging(config: &ClientConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: ClientConfig, user_id: UserId) -> Result<(), AppError> {
    tracing::info!(
        "Starting NotifyHub client v{} for user {}",
        env!("CARGO_PKG_VERSION"),
        user_id
    );

    let transport = TransportConnection::new(&config.transport)?;
    let store = NotificationStore::new(NotificationPreferences::for_user(user_id), &config.store);
    let center = NotificationCenter::new(transport, store, &config.store)?;
    let mut events = center.subscribe_events();

    // Failure here is not fatal; the transport keeps retrying on its own.
    if let Err(e) = center.connect().await {
        tracing::warn!("Initial connection failed: {}", e);
    }

    let mut status = center.transport().watch_status();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                tracing::info!("Connection status: {}", current);
            }
            event = events.recv() => match event {
                Ok(StoreEvent::Surfaced { notification, sound_volume }) => {
                    tracing::info!(
                        id = %notification.id,
                        priority = notification.priority.as_str(),
                        sound_volume = ?sound_volume,
                        "{}: {}",
                        notification.title,
                        notification.message
                    );
                    tracing::info!("Unread notifications: {}", center.unread_count());
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Missed {} store event(s)", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    center.disconnect().await;
    tracing::info!("NotifyHub client stopped");
    Ok(())
}
