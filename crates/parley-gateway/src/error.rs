use thiserror::Error;

/// Failures that end a session. Malformed plaintext and unknown request types
/// are not here: the loop skips those frames and keeps reading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// No configured user key opens the first frame.
    #[error("no configured key opens the first frame")]
    AuthFailure,

    /// A frame on an authenticated session did not open under its bound key.
    #[error("frame failed to decrypt under the session key")]
    DecryptFailure,

    #[error("transport error: {0}")]
    Transport(String),
}
