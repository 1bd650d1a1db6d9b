//! Connection handles and the per-connection state machine

use std::time::Instant;
use tokio::sync::mpsc;
use uuid::Uuid;
use warp::ws::Message;

use crate::auth::authenticator::VerifiedIdentity;

pub type ConnectionId = Uuid;

/// Lifecycle state of one connection, owned by its handler task.
///
/// `Connected -> Authenticated -> InRoom`, with `Authenticated` reachable
/// again via `leave_project`. There is no explicit closed variant: a
/// connection whose transport drops (or that the liveness sweep evicts)
/// leaves the registries exactly once and its handler task ends.
#[derive(Debug, Clone)]
pub enum ConnectionState {
    /// Transport open, no verified identity yet
    Connected,
    /// Identity verified, not collaborating on any project
    Authenticated(VerifiedIdentity),
    /// Member of exactly one project room
    InRoom {
        identity: VerifiedIdentity,
        project_id: String,
    },
}

impl ConnectionState {
    /// The verified identity, if authentication has succeeded
    pub fn identity(&self) -> Option<&VerifiedIdentity> {
        match self {
            Self::Connected => None,
            Self::Authenticated(identity) => Some(identity),
            Self::InRoom { identity, .. } => Some(identity),
        }
    }

    /// The room this connection currently belongs to, if any
    pub fn room(&self) -> Option<&str> {
        match self {
            Self::InRoom { project_id, .. } => Some(project_id),
            _ => None,
        }
    }
}

/// Shared handle to one connection's outbound channel, held by the registry
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub sender: mpsc::UnboundedSender<Message>,
    pub connected_at: Instant,
    /// Cleared by each liveness sweep, set again by any inbound traffic
    pub alive: bool,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, sender: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id,
            sender,
            connected_at: Instant::now(),
            alive: true,
        }
    }

    /// Send a text frame; false when the receiving task is gone
    pub fn send_text(&self, text: &str) -> bool {
        self.sender.send(Message::text(text)).is_ok()
    }

    /// Send a transport-level ping frame
    pub fn send_ping(&self) -> bool {
        self.sender.send(Message::ping(Vec::new())).is_ok()
    }

    /// Ask the forwarding task to close the socket
    pub fn send_close(&self) {
        let _ = self.sender.send(Message::close());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> VerifiedIdentity {
        VerifiedIdentity {
            user_id: "u1".to_string(),
            session_id: "s1".to_string(),
            email: "u1@example.com".to_string(),
            display_name: "User One".to_string(),
        }
    }

    #[test]
    fn test_state_accessors() {
        let state = ConnectionState::Connected;
        assert!(state.identity().is_none());
        assert!(state.room().is_none());

        let state = ConnectionState::Authenticated(identity());
        assert_eq!(state.identity().unwrap().user_id, "u1");
        assert!(state.room().is_none());

        let state = ConnectionState::InRoom {
            identity: identity(),
            project_id: "p1".to_string(),
        };
        assert_eq!(state.room(), Some("p1"));
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle::new(Uuid::new_v4(), tx);
        drop(rx);
        assert!(!handle.send_text("hello"));
    }
}
