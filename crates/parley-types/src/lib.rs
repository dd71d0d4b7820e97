pub mod color;
pub mod config;
pub mod envelope;

pub use color::DisplayColor;
pub use envelope::{EnvelopeError, InboundEnvelope, InboundKind, OutboundEnvelope};
