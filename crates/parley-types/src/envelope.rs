use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::DisplayColor;

/// Sender name the server uses for join/leave notices.
pub const SERVER_SENDER: &str = "SERVER";

/// Colour of every server notice.
pub const NOTICE_COLOR: DisplayColor = DisplayColor::Red;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Request types a client may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundKind {
    Establish,
    Close,
    Chat,
}

impl InboundKind {
    pub fn code(self) -> u8 {
        match self {
            Self::Establish => 0,
            Self::Close => 1,
            Self::Chat => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Establish),
            1 => Some(Self::Close),
            2 => Some(Self::Chat),
            _ => None,
        }
    }
}

/// Plaintext of a client -> server frame.
///
/// `kind` is kept as the raw wire number: an unrecognised value still decodes,
/// and the session loop decides what to do with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEnvelope {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(rename = "msg")]
    pub text: String,
}

impl InboundEnvelope {
    pub fn establish() -> Self {
        Self::new(InboundKind::Establish, String::new())
    }

    pub fn close() -> Self {
        Self::new(InboundKind::Close, String::new())
    }

    pub fn chat(text: impl Into<String>) -> Self {
        Self::new(InboundKind::Chat, text.into())
    }

    pub fn new(kind: InboundKind, text: String) -> Self {
        Self {
            kind: kind.code(),
            text,
        }
    }

    /// `None` when the type number is not one this build understands.
    pub fn kind(&self) -> Option<InboundKind> {
        InboundKind::from_code(self.kind)
    }

    pub fn encode(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Plaintext of a server -> client frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    #[serde(rename = "msg")]
    pub text: String,
    pub from: String,
    pub color: String,
}

impl OutboundEnvelope {
    pub fn joined(name: &str) -> Self {
        Self::notice(format!("{name} has joined the chat"))
    }

    pub fn left(name: &str) -> Self {
        Self::notice(format!("{name} has left the chat"))
    }

    pub fn chat(text: impl Into<String>, from: &str, color: DisplayColor) -> Self {
        Self {
            text: text.into(),
            from: from.to_string(),
            color: color.as_str().to_string(),
        }
    }

    fn notice(text: String) -> Self {
        Self {
            text,
            from: SERVER_SENDER.to_string(),
            color: NOTICE_COLOR.as_str().to_string(),
        }
    }

    /// Join/leave notices come from the server rather than a user.
    pub fn is_notice(&self) -> bool {
        self.from == SERVER_SENDER
    }

    pub fn encode(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
