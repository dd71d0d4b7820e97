//! Server-side loop for one connection.
//!
//! A session starts `Unauthenticated`. Its first frame is run through the
//! [`Authenticator`](crate::auth::Authenticator); a match binds the user and
//! that same frame is then dispatched like any other. From then on every frame
//! is opened with the bound key only, and a frame that fails to open ends the
//! session. Frames are handled strictly one at a time in arrival order.

use std::fmt::Display;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use parley_types::{InboundEnvelope, InboundKind, OutboundEnvelope};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::error::SessionError;
use crate::identity::UserIdentity;
use crate::registry::{ConnectionId, Outbox, RegisteredSession, Removal};
use crate::state::Gateway;

#[derive(Debug, Clone)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(Arc<UserIdentity>),
}

/// Why a session loop ended.
#[derive(Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// The client sent a Close request.
    Requested,
    /// The transport ended the stream.
    TransportClosed,
    Failed(SessionError),
}

enum Flow {
    Continue,
    Close,
}

pub struct Session {
    gateway: Gateway,
    conn_id: ConnectionId,
    outbox: Outbox,
    peer: String,
    state: SessionState,
}

impl Session {
    /// `outbox` feeds this connection's writer; the registry gets a clone of
    /// it when the user joins.
    pub fn new(gateway: Gateway, outbox: Outbox, peer: impl Into<String>) -> Self {
        Self {
            gateway,
            conn_id: Uuid::new_v4(),
            outbox,
            peer: peer.into(),
            state: SessionState::Unauthenticated,
        }
    }

    pub fn conn_id(&self) -> ConnectionId {
        self.conn_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Process `frames` until the transport ends, the client asks to close,
    /// or a frame is fatal. Cleanup (registry removal and the leave notice)
    /// runs exactly once before returning.
    pub async fn run<S, B, E>(mut self, mut frames: S) -> CloseReason
    where
        S: Stream<Item = Result<B, E>> + Unpin,
        B: AsRef<[u8]>,
        E: Display,
    {
        let reason = loop {
            let frame = match frames.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => break CloseReason::Failed(SessionError::Transport(e.to_string())),
                None => break CloseReason::TransportClosed,
            };
            let frame = frame.as_ref();
            trace!(peer = %self.peer, len = frame.len(), "Frame received");

            match self.handle_frame(frame).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Close) => break CloseReason::Requested,
                Err(e) => break CloseReason::Failed(e),
            }
        };

        self.close(&reason).await;
        reason
    }

    async fn handle_frame(&mut self, frame: &[u8]) -> Result<Flow, SessionError> {
        let bound = match &self.state {
            SessionState::Authenticated(identity) => Some(Arc::clone(identity)),
            SessionState::Unauthenticated => None,
        };

        let (identity, plaintext) = match bound {
            Some(identity) => {
                let plaintext = self
                    .gateway
                    .cipher()
                    .open(&identity.key, frame)
                    .map_err(|_| SessionError::DecryptFailure)?;
                (identity, plaintext)
            }
            None => {
                let auth = self
                    .gateway
                    .authenticator()
                    .identify(frame)
                    .ok_or(SessionError::AuthFailure)?;
                info!(user = %auth.identity.name, peer = %self.peer, "Connection authenticated");
                self.state = SessionState::Authenticated(Arc::clone(&auth.identity));
                (auth.identity, auth.plaintext)
            }
        };

        let envelope = match InboundEnvelope::decode(&plaintext) {
            Ok(envelope) => envelope,
            // serde's message can quote the payload, so only the length is logged.
            Err(_) => {
                warn!(user = %identity.name, len = plaintext.len(), "Skipping frame with bad payload");
                return Ok(Flow::Continue);
            }
        };

        Ok(self.dispatch(&identity, envelope).await)
    }

    async fn dispatch(&self, identity: &UserIdentity, envelope: InboundEnvelope) -> Flow {
        match envelope.kind() {
            Some(InboundKind::Establish) => {
                let entry = RegisteredSession {
                    name: identity.name.clone(),
                    conn_id: self.conn_id,
                    key: identity.key,
                    outbox: self.outbox.clone(),
                };
                if let Some(prev) = self.gateway.registry().upsert(entry).await {
                    if prev.conn_id != self.conn_id {
                        info!(
                            user = %identity.name,
                            replaced = %prev.conn_id,
                            "Newer connection took over the registry entry"
                        );
                    }
                }
                info!(user = %identity.name, peer = %self.peer, "{} has joined", identity.name);
                self.gateway
                    .relay()
                    .broadcast(&OutboundEnvelope::joined(&identity.name))
                    .await;
                Flow::Continue
            }
            Some(InboundKind::Close) => Flow::Close,
            Some(InboundKind::Chat) => {
                let event = OutboundEnvelope::chat(envelope.text, &identity.name, identity.color);
                self.gateway.relay().broadcast(&event).await;
                Flow::Continue
            }
            None => {
                debug!(user = %identity.name, kind = envelope.kind, "Ignoring unknown request type");
                Flow::Continue
            }
        }
    }

    async fn close(&self, reason: &CloseReason) {
        let SessionState::Authenticated(identity) = &self.state else {
            match reason {
                CloseReason::Failed(SessionError::AuthFailure) => {
                    warn!(peer = %self.peer, "Invalid user key or server key, closing")
                }
                other => debug!(peer = %self.peer, ?other, "Unauthenticated connection ended"),
            }
            return;
        };

        match reason {
            CloseReason::Failed(e) => warn!(user = %identity.name, peer = %self.peer, "Session failed: {}", e),
            CloseReason::Requested => debug!(user = %identity.name, "Client requested close"),
            CloseReason::TransportClosed => debug!(user = %identity.name, "Transport closed"),
        }

        match self.gateway.registry().remove(&identity.name, self.conn_id).await {
            Removal::Superseded => {
                debug!(user = %identity.name, "Name still held by a newer connection, no leave notice");
            }
            Removal::Removed | Removal::Absent => {
                info!(user = %identity.name, "{} has left", identity.name);
                self.gateway
                    .relay()
                    .broadcast(&OutboundEnvelope::left(&identity.name))
                    .await;
            }
        }
    }
}
