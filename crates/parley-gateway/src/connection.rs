use std::net::SocketAddr;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt, future};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::session::Session;
use crate::state::Gateway;

/// Drive one accepted WebSocket until the session ends.
///
/// A writer task drains the connection's outbox into the socket. The session
/// reads on this task. When the session returns, its outbox handle is dropped;
/// the writer flushes whatever is queued, sends a Close frame and exits.
pub async fn handle_connection(socket: WebSocket, gateway: Gateway, peer: SocketAddr) {
    let (mut sender, receiver) = socket.split();
    let (outbox, mut outbox_rx) = mpsc::unbounded_channel::<Bytes>();

    info!("{} connected to relay", peer);

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbox_rx.recv().await {
            if let Err(e) = sender.send(Message::Binary(frame)).await {
                warn!(%peer, "write: {}", e);
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    // Binary and text frames both carry ciphertext; control frames are
    // answered by axum and skipped here.
    let frames = receiver
        .take_while(|msg| future::ready(!matches!(msg, Ok(Message::Close(_)))))
        .filter_map(|msg| {
            future::ready(match msg {
                Ok(Message::Binary(data)) => Some(Ok(data)),
                Ok(Message::Text(text)) => Some(Ok(Bytes::copy_from_slice(text.as_str().as_bytes()))),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
        });
    let frames = std::pin::pin!(frames);

    let session = Session::new(gateway, outbox, peer.to_string());
    let reason = session.run(frames).await;
    debug!(%peer, ?reason, "Session ended");

    if writer.await.is_err() {
        warn!(%peer, "Writer task panicked");
    }
    info!("{} disconnected from relay", peer);
}
