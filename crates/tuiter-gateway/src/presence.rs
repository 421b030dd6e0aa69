use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

use tuiter_types::events::GatewayEvent;

/// Outbound half of a live connection: its id and the queue its send task
/// drains.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub conn_id: Uuid,
    pub tx: mpsc::UnboundedSender<GatewayEvent>,
}

impl ConnectionHandle {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<GatewayEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { conn_id: Uuid::new_v4(), tx }, rx)
    }
}

/// Tracks which connection each online user is reachable on.
///
/// One entry per user id; a later `add_user` for the same id replaces the
/// earlier connection. Process-local only.
#[derive(Clone, Default)]
pub struct PresenceMap {
    users: Arc<RwLock<HashMap<String, ConnectionHandle>>>,
}

impl PresenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `user_id` to `conn`, replacing any previous binding.
    pub async fn add_user(&self, user_id: String, conn: ConnectionHandle) {
        let previous = self.users.write().await.insert(user_id.clone(), conn);
        if let Some(prev) = previous {
            debug!("{} rebound, dropping connection {}", user_id, prev.conn_id);
        }
    }

    /// Remove `user_id`'s entry, but only if `conn_id` still owns it.
    pub async fn remove_user(&self, user_id: &str, conn_id: Uuid) -> bool {
        let mut users = self.users.write().await;
        match users.get(user_id) {
            Some(handle) if handle.conn_id == conn_id => {
                users.remove(user_id);
                true
            }
            _ => false,
        }
    }

    /// Push `event` to `user_id`'s connection. Returns `false` when the user
    /// is offline or their connection has already gone away. Nothing is
    /// queued for offline users.
    pub async fn send_to_user(&self, user_id: &str, event: GatewayEvent) -> bool {
        let users = self.users.read().await;
        match users.get(user_id) {
            Some(handle) => handle.tx.send(event).is_ok(),
            None => false,
        }
    }

    pub async fn is_online(&self, user_id: &str) -> bool {
        self.users.read().await.contains_key(user_id)
    }

    pub async fn online_count(&self) -> usize {
        self.users.read().await.len()
    }
}
