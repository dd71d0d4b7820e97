use std::fmt;

use chacha20poly1305::aead::OsRng;
use chacha20poly1305::aead::rand_core::RngCore;
use thiserror::Error;

pub const SERVER_KEY_LEN: usize = 32;
pub const USER_KEY_LEN: usize = 24;

#[derive(Debug, Error, PartialEq)]
pub enum KeyError {
    #[error("key is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("key must be {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}

/// Deployment-wide key for the AEAD instance.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerKey([u8; SERVER_KEY_LEN]);

/// Per-user secret. Selects the user's keystream under the server key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct UserKey([u8; USER_KEY_LEN]);

impl ServerKey {
    pub fn from_bytes(bytes: [u8; SERVER_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SERVER_KEY_LEN] {
        &self.0
    }

    pub fn from_hex(encoded: &str) -> Result<Self, KeyError> {
        decode_fixed(encoded).map(Self)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl UserKey {
    pub fn from_bytes(bytes: [u8; USER_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; USER_KEY_LEN] {
        &self.0
    }

    pub fn from_hex(encoded: &str) -> Result<Self, KeyError> {
        decode_fixed(encoded).map(Self)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ServerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServerKey(..)")
    }
}

impl fmt::Debug for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UserKey(..)")
    }
}

fn decode_fixed<const N: usize>(encoded: &str) -> Result<[u8; N], KeyError> {
    let bytes = hex::decode(encoded.trim())?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| KeyError::WrongLength {
        expected: N,
        actual,
    })
}

/// Generate a random server key.
pub fn generate_server_key() -> ServerKey {
    let mut key = [0u8; SERVER_KEY_LEN];
    OsRng.fill_bytes(&mut key);
    ServerKey(key)
}

/// Generate a random user key.
pub fn generate_user_key() -> UserKey {
    let mut key = [0u8; USER_KEY_LEN];
    OsRng.fill_bytes(&mut key);
    UserKey(key)
}
