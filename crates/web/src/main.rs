//! Airlock server: the session engine behind a JSON HTTP API.

use airlock_core::SystemClock;
use airlock_server::{SessionStore, StoreConfig};
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "airlock-server")]
#[command(about = "Cooperative escape-session engine")]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// File the session registry is persisted to. Omit to keep state in memory.
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Countdown for sessions without a deadline override
    #[arg(long, default_value = "45")]
    deadline_minutes: u32,

    /// Activity feed entries kept per session
    #[arg(long, default_value = "256")]
    event_buffer: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.state_file.is_none() {
        tracing::warn!("no --state-file given, sessions will not survive a restart");
    }

    let config = StoreConfig {
        default_deadline_minutes: args.deadline_minutes,
        event_buffer_capacity: args.event_buffer,
        state_path: args.state_file,
        ..StoreConfig::default()
    };
    let store = Arc::new(SessionStore::new(config, Arc::new(SystemClock)));

    let app = airlock_web::router(Arc::clone(&store));
    let listener = TcpListener::bind((args.host.as_str(), args.port)).await?;
    tracing::info!("Airlock server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.flush().await;
    tracing::info!("state flushed, exiting");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
