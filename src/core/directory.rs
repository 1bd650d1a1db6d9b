//! Room directory: project-room membership and the presence index
//!
//! Rooms, presence, and the per-connection map live behind a single lock so
//! that a join racing a sweep-triggered eviction can never observe a
//! connection present in one map but missing from another.

use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use crate::core::connection::ConnectionId;

/// Directory-side record for one authenticated connection
#[derive(Debug, Clone)]
struct Membership {
    user_id: String,
    room_id: Option<String>,
}

#[derive(Default)]
struct DirectoryInner {
    /// Project id -> member connections. Rooms are created lazily on first
    /// join and deleted when their member set empties.
    rooms: HashMap<String, HashSet<ConnectionId>>,
    /// User id -> that user's live connections (multiple devices per account)
    presence: HashMap<String, HashSet<ConnectionId>>,
    /// Connection -> identity and current room
    members: HashMap<ConnectionId, Membership>,
}

impl DirectoryInner {
    /// Remove a connection from its current room, garbage-collecting the
    /// room if it empties. Returns the room that was left.
    fn detach_from_room(&mut self, connection_id: ConnectionId) -> Option<String> {
        let membership = self.members.get_mut(&connection_id)?;
        let room_id = membership.room_id.take()?;

        if let Some(members) = self.rooms.get_mut(&room_id) {
            members.remove(&connection_id);
            if members.is_empty() {
                self.rooms.remove(&room_id);
            }
        }

        Some(room_id)
    }
}

pub struct RoomDirectory {
    inner: RwLock<DirectoryInner>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(DirectoryInner::default()),
        }
    }

    /// Bind a verified identity to a connection and index it for presence.
    /// Re-binding under a different user moves the presence entry.
    pub async fn register_presence(&self, connection_id: ConnectionId, user_id: &str) {
        let mut inner = self.inner.write().await;

        let previous_user = inner
            .members
            .get(&connection_id)
            .filter(|m| m.user_id != user_id)
            .map(|m| m.user_id.clone());
        if let Some(previous_user) = previous_user {
            if let Some(conns) = inner.presence.get_mut(&previous_user) {
                conns.remove(&connection_id);
                if conns.is_empty() {
                    inner.presence.remove(&previous_user);
                }
            }
        }

        inner
            .presence
            .entry(user_id.to_string())
            .or_insert_with(HashSet::new)
            .insert(connection_id);
        inner
            .members
            .entry(connection_id)
            .and_modify(|m| m.user_id = user_id.to_string())
            .or_insert(Membership {
                user_id: user_id.to_string(),
                room_id: None,
            });
    }

    /// Move a connection into a room, leaving its previous room first.
    /// Returns the room that was auto-left, if any. The caller is expected
    /// to have passed the access check already; this only mutates membership.
    pub async fn join(&self, connection_id: ConnectionId, project_id: &str) -> Option<String> {
        let mut inner = self.inner.write().await;

        // Unauthenticated connections have no directory record
        inner.members.get(&connection_id)?;

        let previous = inner.detach_from_room(connection_id);

        inner
            .rooms
            .entry(project_id.to_string())
            .or_insert_with(HashSet::new)
            .insert(connection_id);
        if let Some(membership) = inner.members.get_mut(&connection_id) {
            membership.room_id = Some(project_id.to_string());
        }

        previous
    }

    /// Remove a connection from its room. Idempotent: returns `None` when
    /// the connection was not in any room.
    pub async fn leave(&self, connection_id: ConnectionId) -> Option<String> {
        self.inner.write().await.detach_from_room(connection_id)
    }

    /// Full cleanup on disconnect: drops room membership, presence, and the
    /// member record in one atomic step. Returns the user id and the room
    /// the connection was in, if it was ever authenticated.
    pub async fn remove_connection(
        &self,
        connection_id: ConnectionId,
    ) -> Option<(String, Option<String>)> {
        let mut inner = self.inner.write().await;

        let room_id = inner.detach_from_room(connection_id);
        let membership = inner.members.remove(&connection_id)?;

        if let Some(conns) = inner.presence.get_mut(&membership.user_id) {
            conns.remove(&connection_id);
            if conns.is_empty() {
                inner.presence.remove(&membership.user_id);
            }
        }

        Some((membership.user_id, room_id))
    }

    /// Snapshot of a room's member set; empty for unknown rooms
    pub async fn members_of(&self, project_id: &str) -> Vec<ConnectionId> {
        self.inner
            .read()
            .await
            .rooms
            .get(project_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Snapshot of a user's live connections
    pub async fn connections_of(&self, user_id: &str) -> Vec<ConnectionId> {
        self.inner
            .read()
            .await
            .presence
            .get(user_id)
            .map(|conns| conns.iter().copied().collect())
            .unwrap_or_default()
    }

    pub async fn room_exists(&self, project_id: &str) -> bool {
        self.inner.read().await.rooms.contains_key(project_id)
    }

    pub async fn room_count(&self) -> usize {
        self.inner.read().await.rooms.len()
    }
}

impl Default for RoomDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_join_requires_presence() {
        let directory = RoomDirectory::new();
        let conn = Uuid::new_v4();

        // No presence record yet: join mutates nothing
        assert!(directory.join(conn, "p1").await.is_none());
        assert!(!directory.room_exists("p1").await);

        directory.register_presence(conn, "u1").await;
        directory.join(conn, "p1").await;
        assert_eq!(directory.members_of("p1").await, vec![conn]);
    }

    #[tokio::test]
    async fn test_cross_room_join_auto_leaves() {
        let directory = RoomDirectory::new();
        let conn = Uuid::new_v4();
        directory.register_presence(conn, "u1").await;

        directory.join(conn, "p1").await;
        let previous = directory.join(conn, "p2").await;

        assert_eq!(previous, Some("p1".to_string()));
        assert!(!directory.room_exists("p1").await); // emptied and collected
        assert_eq!(directory.members_of("p2").await, vec![conn]);
    }

    #[tokio::test]
    async fn test_leave_is_idempotent_and_collects_empty_rooms() {
        let directory = RoomDirectory::new();
        let conn = Uuid::new_v4();
        directory.register_presence(conn, "u1").await;
        directory.join(conn, "p1").await;

        assert_eq!(directory.leave(conn).await, Some("p1".to_string()));
        assert!(!directory.room_exists("p1").await);
        assert_eq!(directory.leave(conn).await, None);
    }

    #[tokio::test]
    async fn test_presence_tracks_multiple_devices() {
        let directory = RoomDirectory::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        directory.register_presence(first, "u1").await;
        directory.register_presence(second, "u1").await;
        assert_eq!(directory.connections_of("u1").await.len(), 2);

        directory.remove_connection(first).await;
        assert_eq!(directory.connections_of("u1").await, vec![second]);

        directory.remove_connection(second).await;
        assert!(directory.connections_of("u1").await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_connection_reports_former_room() {
        let directory = RoomDirectory::new();
        let conn = Uuid::new_v4();
        directory.register_presence(conn, "u1").await;
        directory.join(conn, "p1").await;

        let removed = directory.remove_connection(conn).await;
        assert_eq!(removed, Some(("u1".to_string(), Some("p1".to_string()))));

        // Second removal is a no-op
        assert_eq!(directory.remove_connection(conn).await, None);
    }

    #[tokio::test]
    async fn test_concurrent_joins_and_leaves_stay_consistent() {
        let directory = Arc::new(RoomDirectory::new());
        let mut handles = Vec::new();

        for i in 0..16 {
            let dir = directory.clone();
            handles.push(tokio::spawn(async move {
                let conn = Uuid::new_v4();
                let user = format!("user-{}", i);
                dir.register_presence(conn, &user).await;
                dir.join(conn, "shared").await;
                tokio::task::yield_now().await;
                dir.remove_connection(conn).await;
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        // Every connection left: room collected, presence empty
        assert!(!directory.room_exists("shared").await);
        assert_eq!(directory.room_count().await, 0);
    }
}
