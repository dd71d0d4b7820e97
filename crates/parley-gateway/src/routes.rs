use std::future::Future;
use std::net::SocketAddr;

use axum::{
    Router,
    extract::{ConnectInfo, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use tokio::net::TcpListener;

use crate::connection;
use crate::state::Gateway;

/// Default cap on one inbound WebSocket message.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

#[derive(Clone)]
struct RelayState {
    gateway: Gateway,
    max_frame_bytes: usize,
}

/// The relay's only route: a WebSocket upgrade at `/`.
pub fn router(gateway: Gateway, max_frame_bytes: usize) -> Router {
    Router::new().route("/", get(ws_upgrade)).with_state(RelayState {
        gateway,
        max_frame_bytes,
    })
}

/// Serve `app` on `listener` with peer addresses available to handlers,
/// until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

async fn ws_upgrade(
    State(state): State<RelayState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.max_message_size(state.max_frame_bytes)
        .max_frame_size(state.max_frame_bytes)
        .on_upgrade(move |socket| connection::handle_connection(socket, state.gateway, peer))
}
