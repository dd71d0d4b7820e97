//! First-frame authentication.
//!
//! A fresh connection carries no user name: the first frame is trial-opened
//! under each configured user key in configuration order, and the first key
//! that opens it names the user. The probe is linear in the number of users
//! and its running time depends on where the matching key sits in the list,
//! so an observer can learn roughly how far down the list a user is.

use std::sync::Arc;

use parley_crypto::CipherContext;
use tracing::trace;

use crate::identity::UserIdentity;

/// An identity bound by a successful probe, with the frame it opened.
#[derive(Debug)]
pub struct Authenticated {
    pub identity: Arc<UserIdentity>,
    pub plaintext: Vec<u8>,
}

#[derive(Clone)]
pub struct Authenticator {
    identities: Arc<[Arc<UserIdentity>]>,
    cipher: Arc<CipherContext>,
}

impl Authenticator {
    pub fn new(identities: Vec<UserIdentity>, cipher: Arc<CipherContext>) -> Self {
        let identities: Vec<Arc<UserIdentity>> = identities.into_iter().map(Arc::new).collect();
        Self {
            identities: identities.into(),
            cipher,
        }
    }

    /// Returns `None` when no configured key opens `ciphertext`.
    pub fn identify(&self, ciphertext: &[u8]) -> Option<Authenticated> {
        self.identities.iter().find_map(|identity| {
            let plaintext = self.cipher.open(&identity.key, ciphertext).ok()?;
            trace!(user = %identity.name, "First frame opened");
            Some(Authenticated {
                identity: Arc::clone(identity),
                plaintext,
            })
        })
    }

    pub fn identities(&self) -> &[Arc<UserIdentity>] {
        &self.identities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_crypto::keys::{generate_server_key, generate_user_key};
    use parley_crypto::UserKey;
    use parley_types::DisplayColor;

    fn setup(keys: &[UserKey]) -> (Authenticator, Arc<CipherContext>) {
        let cipher = Arc::new(CipherContext::new(&generate_server_key()));
        let identities = keys
            .iter()
            .enumerate()
            .map(|(i, key)| UserIdentity::new(format!("user{i}"), DisplayColor::Green, *key))
            .collect();
        (Authenticator::new(identities, Arc::clone(&cipher)), cipher)
    }

    #[test]
    fn binds_the_user_whose_key_sealed_the_frame() {
        let keys: Vec<UserKey> = (0..5).map(|_| generate_user_key()).collect();
        let (auth, cipher) = setup(&keys);

        for (i, key) in keys.iter().enumerate() {
            let frame = cipher.seal(key, b"{\"type\":0,\"msg\":\"\"}").unwrap();
            let bound = auth.identify(&frame).expect("key is configured");
            assert_eq!(bound.identity.name, format!("user{i}"));
            assert_eq!(bound.plaintext, b"{\"type\":0,\"msg\":\"\"}");
        }
    }

    #[test]
    fn unknown_key_fails() {
        let (auth, cipher) = setup(&[generate_user_key(), generate_user_key()]);
        let frame = cipher.seal(&generate_user_key(), b"hello").unwrap();
        assert!(auth.identify(&frame).is_none());
        assert!(auth.identify(b"garbage").is_none());
        assert!(auth.identify(&[]).is_none());
    }

    #[test]
    fn first_configured_match_wins() {
        let shared = generate_user_key();
        let (auth, cipher) = setup(&[generate_user_key(), shared, shared]);

        let frame = cipher.seal(&shared, b"hello").unwrap();
        assert_eq!(auth.identify(&frame).unwrap().identity.name, "user1");
    }

    #[test]
    fn empty_identity_set_rejects_everything() {
        let (auth, cipher) = setup(&[]);
        let frame = cipher.seal(&generate_user_key(), b"hello").unwrap();
        assert!(auth.identify(&frame).is_none());
        assert!(auth.identities().is_empty());
    }
}
