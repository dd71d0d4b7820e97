mod config;
mod display;
mod session;

use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;

use crate::display::Line;

/// Terminal client for a parley relay
#[derive(Parser)]
#[command(name = "parley-client", version, about)]
struct Cli {
    /// Path to the JSON client file
    #[arg(long, env = "PARLEY_CLIENT_CONFIG", default_value = "client.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Logs go to stderr; stdout is the chat.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let settings = config::load(&cli.config)?;

    let (output, mut lines) = mpsc::unbounded_channel::<Line>();
    let printer = tokio::spawn(async move {
        while let Some(line) = lines.recv().await {
            line.print();
        }
    });

    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let result = session::run(settings, session::spawn_stdin_reader(), output, ctrl_c).await;

    let _ = printer.await;
    result
}
