/// Parley Crypto Library
///
/// One XChaCha20-Poly1305 instance per process, keyed with the deployment's
/// 32-byte server key. Every frame is sealed with the 24-byte key of the user
/// on the other end of the connection, supplied in the nonce slot, so the
/// same instance yields a distinct keystream per user.

pub mod cipher;
pub mod keys;

pub use cipher::{CipherContext, CipherError, TAG_LEN};
pub use keys::{KeyError, SERVER_KEY_LEN, ServerKey, USER_KEY_LEN, UserKey};
