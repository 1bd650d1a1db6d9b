//! Gateway coordination service
//!
//! The one shared, explicitly constructed object of the process: owns the
//! connection registry, the room directory, and the handles to the external
//! stores. Created once at startup and passed by `Arc` into every connection
//! handler and the liveness sweep.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use crate::auth::authenticator::{Authenticator, VerifiedIdentity};
use crate::core::connection::{ConnectionHandle, ConnectionId};
use crate::core::directory::RoomDirectory;
use crate::core::envelope::ServerMessage;
use crate::core::registry::ConnectionRegistry;
use crate::error::{GatewayError, Result};
use crate::stores::traits::{AccessDecision, ProjectStore, SessionStore};

/// Outcome of a granted room join
#[derive(Debug)]
pub struct JoinOutcome {
    pub project_name: String,
    /// Room the connection auto-left to satisfy the one-room-per-connection
    /// constraint, if it was in one
    pub previous_room: Option<String>,
}

/// What a disconnect cleaned up, for logging and notifications
#[derive(Debug)]
pub struct Disconnected {
    pub user_id: Option<String>,
    pub room_id: Option<String>,
}

pub struct Gateway {
    registry: ConnectionRegistry,
    directory: RoomDirectory,
    authenticator: Authenticator,
    projects: Arc<dyn ProjectStore>,
}

// Shared reference to the gateway
pub type SharedGateway = Arc<Gateway>;

impl Gateway {
    pub fn new(
        jwt_secret: &str,
        sessions: Arc<dyn SessionStore>,
        projects: Arc<dyn ProjectStore>,
    ) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            directory: RoomDirectory::new(),
            authenticator: Authenticator::new(jwt_secret, sessions),
            projects,
        }
    }

    /// Register a freshly accepted connection
    pub async fn register_connection(&self, handle: ConnectionHandle) {
        self.registry.register(handle).await;
    }

    /// Record inbound traffic for liveness purposes
    pub async fn touch(&self, connection_id: ConnectionId) {
        self.registry.mark_alive(connection_id).await;
    }

    /// Verify a bearer credential and, on success, bind the identity to the
    /// connection in the presence index.
    pub async fn authenticate(
        &self,
        connection_id: ConnectionId,
        token: &str,
    ) -> Result<VerifiedIdentity> {
        let identity = self.authenticator.verify(token).await?;
        self.directory
            .register_presence(connection_id, &identity.user_id)
            .await;
        Ok(identity)
    }

    /// Join a project room on behalf of an authenticated connection.
    ///
    /// The access check runs first; a denial leaves membership untouched,
    /// including the room the connection may already be in.
    pub async fn join_project(
        &self,
        connection_id: ConnectionId,
        user_id: &str,
        project_id: &str,
    ) -> Result<JoinOutcome> {
        match self.projects.check_access(project_id, user_id).await? {
            AccessDecision::Granted { project_name } => {
                let previous_room = self.directory.join(connection_id, project_id).await;
                log::debug!(
                    "Connection {} joined room {} (user {})",
                    connection_id,
                    project_id,
                    user_id
                );
                Ok(JoinOutcome {
                    project_name,
                    previous_room,
                })
            }
            AccessDecision::Denied => Err(GatewayError::Authorization(format!(
                "no access to project {}",
                project_id
            ))),
        }
    }

    /// Remove a connection from its current room. Idempotent.
    pub async fn leave_project(&self, connection_id: ConnectionId) -> Option<String> {
        self.directory.leave(connection_id).await
    }

    /// Fan a message out to every open member of a room except `exclude`.
    /// Unknown rooms and rooms holding only the excluded sender deliver to
    /// nobody; neither is an error. Returns the delivery count.
    pub async fn broadcast_to_room(
        &self,
        project_id: &str,
        message: &ServerMessage,
        exclude: Option<ConnectionId>,
    ) -> usize {
        let members = self.directory.members_of(project_id).await;
        if members.is_empty() {
            return 0;
        }

        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                log::error!("Failed to serialize broadcast message: {}", e);
                return 0;
            }
        };

        let mut delivered = 0;
        for member in members {
            if Some(member) == exclude {
                continue;
            }
            // Fire-and-forget: a member mid-disconnect just misses out
            if self.registry.send_text(member, &text).await {
                delivered += 1;
            } else {
                log::trace!("Skipped delivery to closed connection {}", member);
            }
        }

        log::debug!(
            "Broadcast to room {}: {} deliveries",
            project_id,
            delivered
        );
        delivered
    }

    /// Send a message to a single connection
    pub async fn send_to(&self, connection_id: ConnectionId, message: &ServerMessage) -> bool {
        match serde_json::to_string(message) {
            Ok(text) => self.registry.send_text(connection_id, &text).await,
            Err(e) => {
                log::error!("Failed to serialize message: {}", e);
                false
            }
        }
    }

    /// Tear a connection down: the one cleanup path, shared by transport
    /// close, protocol escalation, and heartbeat eviction. Removal from the
    /// registry is the exactly-once gate; losers of the race get `None`.
    /// If the connection was in a room, its former room gets one `user_left`.
    pub async fn disconnect(&self, connection_id: ConnectionId) -> Option<Disconnected> {
        let handle = self.registry.remove(connection_id).await?;
        handle.send_close();

        let removed = self.directory.remove_connection(connection_id).await;
        let (user_id, room_id) = match removed {
            Some((user, room)) => (Some(user), room),
            None => (None, None),
        };

        if let (Some(user), Some(room)) = (user_id.as_ref(), room_id.as_ref()) {
            let notice = ServerMessage::UserLeft {
                user_id: user.clone(),
                project_id: room.clone(),
            };
            self.broadcast_to_room(room, &notice, None).await;
        }

        log::info!(
            "Connection {} closed ({} remaining)",
            connection_id,
            self.registry.connection_count().await
        );

        Some(Disconnected { user_id, room_id })
    }

    /// One liveness sweep: evict connections that stayed silent for a full
    /// interval, ping the rest. Returns the evicted ids.
    pub async fn heartbeat_sweep(&self) -> Vec<ConnectionId> {
        let dead = self.registry.sweep().await;
        let mut evicted = Vec::new();

        for connection_id in dead {
            log::warn!("Evicting unresponsive connection {}", connection_id);
            if self.disconnect(connection_id).await.is_some() {
                evicted.push(connection_id);
            }
        }

        evicted
    }

    /// Run the liveness sweep on a fixed period for the life of the process
    pub fn start_heartbeat_task(self: Arc<Self>, period: Duration) {
        tokio::spawn(async move {
            let mut ticker = interval(period);
            // The first tick fires immediately; skip it so a connection gets
            // a full interval before its first probe
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = self.heartbeat_sweep().await;
                if !evicted.is_empty() {
                    log::info!("Heartbeat sweep evicted {} connections", evicted.len());
                }
            }
        });
    }

    pub async fn connection_count(&self) -> usize {
        self.registry.connection_count().await
    }

    pub async fn room_count(&self) -> usize {
        self.directory.room_count().await
    }

    /// Snapshot of a user's live connections (presence lookups)
    pub async fn connections_of(&self, user_id: &str) -> Vec<ConnectionId> {
        self.directory.connections_of(user_id).await
    }
}
