use std::fmt;

use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use thiserror::Error;

use crate::keys::{ServerKey, UserKey};

/// Poly1305 tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// Tag mismatch, truncated input, or a ciphertext sealed under another key.
    #[error("ciphertext failed authentication")]
    AuthFailure,
    #[error("sealing failed")]
    SealFailure,
}

/// Seals and opens frames for both ends of a connection.
///
/// Output is `ciphertext || tag`, with no nonce prefix: the user key in the
/// nonce slot is known to both sides already.
#[derive(Clone)]
pub struct CipherContext {
    aead: XChaCha20Poly1305,
}

impl CipherContext {
    pub fn new(server_key: &ServerKey) -> Self {
        let aead = XChaCha20Poly1305::new(Key::from_slice(server_key.as_bytes()));
        Self { aead }
    }

    pub fn seal(&self, key: &UserKey, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        self.aead
            .encrypt(XNonce::from_slice(key.as_bytes()), plaintext)
            .map_err(|_| CipherError::SealFailure)
    }

    pub fn open(&self, key: &UserKey, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        if ciphertext.len() < TAG_LEN {
            return Err(CipherError::AuthFailure);
        }
        self.aead
            .decrypt(XNonce::from_slice(key.as_bytes()), ciphertext)
            .map_err(|_| CipherError::AuthFailure)
    }
}

impl fmt::Debug for CipherContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherContext").finish_non_exhaustive()
    }
}
