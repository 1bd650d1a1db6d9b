//! Connection registry: outbound senders and liveness flags
//!
//! Removal from this registry is the single gate for connection teardown;
//! whichever caller removes the handle first runs cleanup, everyone else
//! sees a no-op.

use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::core::connection::{ConnectionHandle, ConnectionId};

pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a freshly accepted connection
    pub async fn register(&self, handle: ConnectionHandle) {
        self.connections.write().await.insert(handle.id, handle);
    }

    /// Remove a connection, returning its handle to whoever won the race
    pub async fn remove(&self, id: ConnectionId) -> Option<ConnectionHandle> {
        self.connections.write().await.remove(&id)
    }

    /// Send a text frame to one connection; false if it is gone or backed up
    pub async fn send_text(&self, id: ConnectionId, text: &str) -> bool {
        match self.connections.read().await.get(&id) {
            Some(handle) => handle.send_text(text),
            None => false,
        }
    }

    /// Mark a connection as responsive (any inbound frame counts)
    pub async fn mark_alive(&self, id: ConnectionId) {
        if let Some(handle) = self.connections.write().await.get_mut(&id) {
            handle.alive = true;
        }
    }

    /// One liveness sweep: connections that stayed silent since the previous
    /// sweep are returned for eviction; the rest get their flag cleared and a
    /// transport ping.
    pub async fn sweep(&self) -> Vec<ConnectionId> {
        let mut connections = self.connections.write().await;
        let mut dead = Vec::new();

        for (id, handle) in connections.iter_mut() {
            if handle.alive {
                handle.alive = false;
                if !handle.send_ping() {
                    // Forwarding task already gone; treat as unresponsive
                    dead.push(*id);
                }
            } else {
                dead.push(*id);
            }
        }

        dead
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn handle() -> (ConnectionId, ConnectionHandle, mpsc::UnboundedReceiver<warp::ws::Message>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        (id, ConnectionHandle::new(id, tx), rx)
    }

    #[tokio::test]
    async fn test_register_send_remove() {
        let registry = ConnectionRegistry::new();
        let (id, h, mut rx) = handle();
        registry.register(h).await;

        assert!(registry.send_text(id, "hi").await);
        assert!(rx.recv().await.unwrap().to_str().is_ok());

        assert!(registry.remove(id).await.is_some());
        assert!(registry.remove(id).await.is_none());
        assert!(!registry.send_text(id, "gone").await);
    }

    #[tokio::test]
    async fn test_sweep_evicts_after_one_silent_interval() {
        let registry = ConnectionRegistry::new();
        let (id, h, _rx) = handle();
        registry.register(h).await;

        // First sweep clears the flag and pings; nothing evicted
        assert!(registry.sweep().await.is_empty());

        // Still silent: second sweep reports it dead
        assert_eq!(registry.sweep().await, vec![id]);
    }

    #[tokio::test]
    async fn test_traffic_resets_liveness() {
        let registry = ConnectionRegistry::new();
        let (id, h, _rx) = handle();
        registry.register(h).await;

        assert!(registry.sweep().await.is_empty());
        registry.mark_alive(id).await;
        assert!(registry.sweep().await.is_empty());
    }
}
