use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parley_crypto::UserKey;
use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

/// Identifies one accepted transport connection.
pub type ConnectionId = Uuid;

/// Queue of sealed frames drained by a connection's writer task.
pub type Outbox = mpsc::UnboundedSender<Bytes>;

/// A joined user as the relay sees it.
#[derive(Debug, Clone)]
pub struct RegisteredSession {
    pub name: String,
    pub conn_id: ConnectionId,
    pub key: UserKey,
    pub outbox: Outbox,
}

/// Result of [`Registry::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The entry belonged to this connection and is gone.
    Removed,
    /// Nothing was registered under the name.
    Absent,
    /// A newer connection owns the name; its entry was left alone.
    Superseded,
}

/// Live connections keyed by user name.
///
/// Every read and write goes through one lock, so joins, leaves and broadcast
/// snapshots from different connections never interleave mid-operation.
#[derive(Clone, Default)]
pub struct Registry {
    sessions: Arc<RwLock<HashMap<String, RegisteredSession>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `session.name`. Returns the evicted
    /// entry, if any. The evicted connection is not closed; it just stops
    /// receiving broadcasts.
    pub async fn upsert(&self, session: RegisteredSession) -> Option<RegisteredSession> {
        let name = session.name.clone();
        let previous = self.sessions.write().await.insert(name.clone(), session);
        if let Some(prev) = &previous {
            debug!(user = %name, evicted = %prev.conn_id, "Registry entry replaced");
        }
        previous
    }

    /// Remove `name`, but only if the entry still belongs to `conn_id`.
    pub async fn remove(&self, name: &str, conn_id: ConnectionId) -> Removal {
        let mut sessions = self.sessions.write().await;
        match sessions.get(name) {
            None => Removal::Absent,
            Some(entry) if entry.conn_id != conn_id => Removal::Superseded,
            Some(_) => {
                sessions.remove(name);
                Removal::Removed
            }
        }
    }

    /// Point-in-time copy for a broadcast pass.
    pub async fn snapshot(&self) -> Vec<RegisteredSession> {
        self.sessions.read().await.values().cloned().collect()
    }

    /// Connection currently registered under `name`.
    pub async fn owner(&self, name: &str) -> Option<ConnectionId> {
        self.sessions.read().await.get(name).map(|s| s.conn_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> (RegisteredSession, mpsc::UnboundedReceiver<Bytes>) {
        let (outbox, rx) = mpsc::unbounded_channel();
        let session = RegisteredSession {
            name: name.to_string(),
            conn_id: Uuid::new_v4(),
            key: UserKey::from_bytes([0u8; 24]),
            outbox,
        };
        (session, rx)
    }

    #[tokio::test]
    async fn upsert_same_name_replaces_entry() {
        let registry = Registry::new();
        let (a, _rx_a) = entry("alice");
        let (b, _rx_b) = entry("alice");
        let (a_id, b_id) = (a.conn_id, b.conn_id);

        assert!(registry.upsert(a).await.is_none());
        let evicted = registry.upsert(b).await.expect("first entry evicted");

        assert_eq!(evicted.conn_id, a_id);
        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.owner("alice").await, Some(b_id));
    }

    #[tokio::test]
    async fn eviction_does_not_close_the_old_outbox() {
        let registry = Registry::new();
        let (a, mut rx_a) = entry("alice");
        let a_outbox = a.outbox.clone();
        let (b, _rx_b) = entry("alice");

        registry.upsert(a).await;
        registry.upsert(b).await;

        a_outbox.send(Bytes::from_static(b"still open")).unwrap();
        assert_eq!(rx_a.recv().await.unwrap(), Bytes::from_static(b"still open"));
    }

    #[tokio::test]
    async fn remove_only_touches_own_entry() {
        let registry = Registry::new();
        let (a, _rx_a) = entry("alice");
        let (b, _rx_b) = entry("alice");
        let (a_id, b_id) = (a.conn_id, b.conn_id);

        registry.upsert(a).await;
        registry.upsert(b).await;

        assert_eq!(registry.remove("alice", a_id).await, Removal::Superseded);
        assert_eq!(registry.len().await, 1);

        assert_eq!(registry.remove("alice", b_id).await, Removal::Removed);
        assert!(registry.is_empty().await);

        assert_eq!(registry.remove("alice", b_id).await, Removal::Absent);
    }

    #[tokio::test]
    async fn snapshot_is_point_in_time() {
        let registry = Registry::new();
        let (a, _rx_a) = entry("alice");
        let (b, _rx_b) = entry("bob");
        let b_id = b.conn_id;
        registry.upsert(a).await;
        registry.upsert(b).await;

        let snapshot = registry.snapshot().await;
        registry.remove("bob", b_id).await;

        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_and_leaves_stay_consistent() {
        let registry = Registry::new();
        let mut handles = Vec::new();

        for i in 0..64 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let (session, _rx) = entry(&format!("user{i}"));
                let conn_id = session.conn_id;
                registry.upsert(session).await;
                let _ = registry.snapshot().await;
                if i % 2 == 0 {
                    assert_eq!(registry.remove(&format!("user{i}"), conn_id).await, Removal::Removed);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.len().await, 32);
        let mut names: Vec<String> = registry.snapshot().await.into_iter().map(|s| s.name).collect();
        names.sort();
        assert!(names.iter().all(|n| n.trim_start_matches("user").parse::<u32>().unwrap() % 2 == 1));
    }
}
