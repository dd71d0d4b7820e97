use std::sync::Arc;

use bytes::Bytes;
use parley_crypto::CipherContext;
use parley_types::OutboundEnvelope;
use tracing::{error, trace, warn};

use crate::registry::Registry;

/// Outcome of one broadcast pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub failed: usize,
}

/// Seals one event per recipient and queues it on every registered connection.
#[derive(Clone)]
pub struct Relay {
    registry: Registry,
    cipher: Arc<CipherContext>,
}

impl Relay {
    pub fn new(registry: Registry, cipher: Arc<CipherContext>) -> Self {
        Self { registry, cipher }
    }

    /// Deliver `event` to everyone in the registry at the moment of the call.
    ///
    /// A recipient whose connection is gone is logged and skipped; it stays
    /// registered until its own session cleans up.
    pub async fn broadcast(&self, event: &OutboundEnvelope) -> Delivery {
        let plaintext = match event.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to encode outbound envelope: {}", e);
                return Delivery::default();
            }
        };

        let recipients = self.registry.snapshot().await;
        let mut delivery = Delivery::default();

        for recipient in &recipients {
            let frame = match self.cipher.seal(&recipient.key, &plaintext) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(user = %recipient.name, "Seal failed: {}", e);
                    delivery.failed += 1;
                    continue;
                }
            };

            if recipient.outbox.send(Bytes::from(frame)).is_err() {
                warn!(user = %recipient.name, conn = %recipient.conn_id, "Delivery failed: connection writer is gone");
                delivery.failed += 1;
                continue;
            }
            delivery.delivered += 1;
        }

        trace!(
            from = %event.from,
            delivered = delivery.delivered,
            failed = delivery.failed,
            "Broadcast complete"
        );
        delivery
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegisteredSession;
    use parley_crypto::keys::{generate_server_key, generate_user_key};
    use parley_crypto::UserKey;
    use parley_types::DisplayColor;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn entry(name: &str) -> (UserKey, mpsc::UnboundedReceiver<Bytes>, RegisteredSession) {
        let key = generate_user_key();
        let (outbox, rx) = mpsc::unbounded_channel();
        let session = RegisteredSession {
            name: name.to_string(),
            conn_id: Uuid::new_v4(),
            key,
            outbox,
        };
        (key, rx, session)
    }

    #[tokio::test]
    async fn each_recipient_gets_a_frame_sealed_under_its_own_key() {
        let cipher = Arc::new(CipherContext::new(&generate_server_key()));
        let registry = Registry::new();
        let relay = Relay::new(registry.clone(), Arc::clone(&cipher));

        let (ka, mut rx_a, a) = entry("alice");
        let (kb, mut rx_b, b) = entry("bob");
        registry.upsert(a).await;
        registry.upsert(b).await;

        let event = OutboundEnvelope::chat("hi", "alice", DisplayColor::Blue);
        let delivery = relay.broadcast(&event).await;
        assert_eq!(delivery, Delivery { delivered: 2, failed: 0 });

        let frame_a = rx_a.try_recv().unwrap();
        let frame_b = rx_b.try_recv().unwrap();
        assert_ne!(frame_a, frame_b);

        let opened_a = OutboundEnvelope::decode(&cipher.open(&ka, &frame_a).unwrap()).unwrap();
        let opened_b = OutboundEnvelope::decode(&cipher.open(&kb, &frame_b).unwrap()).unwrap();
        assert_eq!(opened_a, event);
        assert_eq!(opened_b, event);
        assert!(cipher.open(&kb, &frame_a).is_err());

        assert!(rx_a.try_recv().is_err(), "exactly one copy per recipient");
    }

    #[tokio::test]
    async fn dead_recipient_does_not_stop_the_others() {
        let cipher = Arc::new(CipherContext::new(&generate_server_key()));
        let registry = Registry::new();
        let relay = Relay::new(registry.clone(), cipher);

        let (_, rx_dead, dead) = entry("carol");
        let (_, mut rx_a, a) = entry("alice");
        let (_, mut rx_b, b) = entry("bob");
        registry.upsert(dead).await;
        registry.upsert(a).await;
        registry.upsert(b).await;
        drop(rx_dead);

        let delivery = relay.broadcast(&OutboundEnvelope::joined("bob")).await;

        assert_eq!(delivery, Delivery { delivered: 2, failed: 1 });
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
        assert_eq!(registry.len().await, 3, "failed delivery leaves registry untouched");
    }

    #[tokio::test]
    async fn empty_registry_delivers_nothing() {
        let cipher = Arc::new(CipherContext::new(&generate_server_key()));
        let relay = Relay::new(Registry::new(), cipher);
        assert_eq!(
            relay.broadcast(&OutboundEnvelope::left("x")).await,
            Delivery::default()
        );
    }
}
