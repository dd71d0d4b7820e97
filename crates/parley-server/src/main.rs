mod config;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tower_http::trace::TraceLayer;
use tracing::info;

use parley_crypto::CipherContext;
use parley_crypto::keys::{generate_server_key, generate_user_key};
use parley_gateway::Gateway;
use parley_gateway::routes::{self, DEFAULT_MAX_FRAME_BYTES};

/// Encrypted multi-user chat relay
#[derive(Parser)]
#[command(name = "parley-server", version, about)]
struct Cli {
    /// Path to the JSON deployment file
    #[arg(long, env = "PARLEY_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Listen address, overriding the one in the deployment file
    #[arg(long, env = "PARLEY_LISTEN")]
    listen: Option<String>,

    /// Largest inbound WebSocket message accepted, in bytes
    #[arg(long, env = "PARLEY_MAX_FRAME_BYTES", default_value_t = DEFAULT_MAX_FRAME_BYTES)]
    max_frame_bytes: usize,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print a fresh random key as hex
    Keygen {
        #[arg(value_enum)]
        kind: KeyKind,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KeyKind {
    /// 32-byte server key
    Server,
    /// 24-byte user key
    User,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Some(Command::Keygen { kind }) = cli.command {
        let key = match kind {
            KeyKind::Server => generate_server_key().to_hex(),
            KeyKind::User => generate_user_key().to_hex(),
        };
        println!("{key}");
        return Ok(());
    }

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley_server=debug,parley_gateway=debug,tower_http=debug".into()),
        )
        .init();

    let settings = config::load(&cli.config)?;
    let listen = cli.listen.unwrap_or(settings.listen);
    let user_count = settings.identities.len();

    let gateway = Gateway::new(CipherContext::new(&settings.server_key), settings.identities);

    let app = routes::router(gateway, cli.max_frame_bytes).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    info!(
        "Parley relay listening on {} ({} users, max frame {} bytes)",
        listener.local_addr()?,
        user_count,
        cli.max_frame_bytes
    );

    routes::serve(listener, app, shutdown_signal()).await?;

    info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
