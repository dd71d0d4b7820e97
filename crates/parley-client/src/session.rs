use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use parley_crypto::{CipherContext, UserKey};
use parley_types::{DisplayColor, InboundEnvelope};

use crate::config::ClientSettings;
use crate::display::{self, Line};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lines to show the user, in order.
pub type Output = mpsc::UnboundedSender<Line>;

const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Why the input loop stopped.
enum Exit {
    /// Input ended or shutdown was requested; say goodbye to the relay.
    Quit,
    /// The relay went away first.
    Disconnected,
}

struct Sender {
    sink: SplitSink<Socket, Message>,
    cipher: CipherContext,
    key: UserKey,
}

impl Sender {
    async fn send(&mut self, envelope: &InboundEnvelope) -> anyhow::Result<()> {
        let plaintext = envelope.encode()?;
        let frame = self.cipher.seal(&self.key, &plaintext)?;
        self.sink.send(Message::binary(frame)).await?;
        Ok(())
    }

    /// Send one typed line as a chat message. Empty lines are dropped.
    async fn send_line(&mut self, line: String, output: &Output) {
        if line.is_empty() {
            return;
        }
        if let Err(e) = self.send(&InboundEnvelope::chat(line)).await {
            show(output, Line::local(format!("Cannot send message: {e}"), DisplayColor::Red));
        }
    }
}

fn show(output: &Output, line: Line) {
    let _ = output.send(line);
}

/// Connect, announce ourselves, then relay `input` lines until input ends,
/// `shutdown` resolves, or the relay disconnects.
pub async fn run<F>(
    settings: ClientSettings,
    mut input: mpsc::UnboundedReceiver<String>,
    output: Output,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    let url = settings.url();
    let (socket, _) = connect_async(url.as_str())
        .await
        .with_context(|| format!("failed to connect to {url}"))?;
    info!("Connected to {}", url);

    let cipher = CipherContext::new(&settings.server_key);
    let (sink, stream) = socket.split();
    let mut sender = Sender {
        sink,
        cipher: cipher.clone(),
        key: settings.user_key,
    };

    sender
        .send(&InboundEnvelope::establish())
        .await
        .context("failed to send hello")?;
    show(
        &output,
        Line::local(format!("Connected to {}", settings.server), DisplayColor::Blue),
    );

    let mut reader = tokio::spawn(read_frames(stream, cipher, settings.user_key, output.clone()));
    tokio::pin!(shutdown);

    let exit = loop {
        tokio::select! {
            line = input.recv() => match line {
                Some(line) => sender.send_line(line, &output).await,
                None => break Exit::Quit,
            },
            _ = &mut shutdown => break Exit::Quit,
            _ = &mut reader => break Exit::Disconnected,
        }
    };

    match exit {
        Exit::Quit => {
            if let Err(e) = sender.send(&InboundEnvelope::close()).await {
                warn!("Failed to send close request: {}", e);
            }
            if let Err(e) = sender.sink.send(Message::Close(None)).await {
                warn!("Failed to send close frame: {}", e);
            }
            if tokio::time::timeout(CLOSE_GRACE, &mut reader).await.is_err() {
                debug!("Relay did not close within {:?}", CLOSE_GRACE);
                reader.abort();
            }
        }
        Exit::Disconnected => {
            show(&output, Line::local("Disconnected from server", DisplayColor::Red));
        }
    }

    Ok(())
}

async fn read_frames(
    mut stream: SplitStream<Socket>,
    cipher: CipherContext,
    key: UserKey,
    output: Output,
) {
    while let Some(msg) = stream.next().await {
        let frame = match msg {
            Ok(Message::Binary(data)) => data,
            Ok(Message::Text(text)) => text.as_bytes().to_vec().into(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                show(
                    &output,
                    Line::local(format!("Error on reading message: {e}"), DisplayColor::Red),
                );
                break;
            }
        };
        if let Some(line) = display::interpret(&cipher, &key, &frame) {
            show(&output, line);
        }
    }
}

/// Blocking stdin reads live on their own thread so that quitting never waits
/// for the next keypress.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });
    rx
}
