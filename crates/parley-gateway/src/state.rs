use std::sync::Arc;

use parley_crypto::CipherContext;

use crate::auth::Authenticator;
use crate::identity::UserIdentity;
use crate::registry::Registry;
use crate::relay::Relay;

/// Everything the connection tasks share. Clone shares the inner state.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    cipher: Arc<CipherContext>,
    authenticator: Authenticator,
    registry: Registry,
    relay: Relay,
}

impl Gateway {
    /// `identities` order is the authentication probe order.
    pub fn new(cipher: CipherContext, identities: Vec<UserIdentity>) -> Self {
        let cipher = Arc::new(cipher);
        let registry = Registry::new();
        Self {
            inner: Arc::new(GatewayInner {
                authenticator: Authenticator::new(identities, Arc::clone(&cipher)),
                relay: Relay::new(registry.clone(), Arc::clone(&cipher)),
                registry,
                cipher,
            }),
        }
    }

    pub fn cipher(&self) -> &CipherContext {
        &self.inner.cipher
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.inner.authenticator
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn relay(&self) -> &Relay {
        &self.inner.relay
    }
}
