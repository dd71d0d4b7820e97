//! Server side of the relay: who may connect, who is connected, and how one
//! event reaches every connected user.
//!
//! ```text
//! WebSocket (connection.rs)
//!     |  raw frames
//!     v
//! Session (session.rs)   Unauthenticated -> Authenticated -> closed
//!     |  first frame: Authenticator (auth.rs) probes the configured keys
//!     |  later frames: opened with the bound user's key only
//!     v
//! Relay (relay.rs) ---- snapshot ----> Registry (registry.rs)
//!     |  sealed once per recipient
//!     v
//! per-connection outbox -> writer task -> WebSocket
//! ```

pub mod auth;
pub mod connection;
pub mod error;
pub mod identity;
pub mod registry;
pub mod relay;
pub mod routes;
pub mod session;
pub mod state;

pub use auth::Authenticator;
pub use error::SessionError;
pub use identity::UserIdentity;
pub use registry::{ConnectionId, Outbox, RegisteredSession, Registry, Removal};
pub use relay::{Delivery, Relay};
pub use session::{CloseReason, Session, SessionState};
pub use state::Gateway;
