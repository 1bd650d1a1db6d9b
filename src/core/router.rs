//! Message router: envelope dispatch and state-machine enforcement
//!
//! Every inbound frame for a connection flows through `dispatch`, in arrival
//! order, with the connection's state machine passed in by the handler task.
//! Handler failures become structured replies; nothing here closes the
//! connection.

use crate::core::connection::{ConnectionId, ConnectionState};
use crate::core::envelope::{stamp_payload, ClientMessage, Envelope, ServerMessage};
use crate::core::gateway::SharedGateway;
use crate::error::{GatewayError, Result};
use serde_json::Value;

pub struct MessageRouter {
    gateway: SharedGateway,
    max_envelope_bytes: usize,
}

impl MessageRouter {
    pub fn new(gateway: SharedGateway, max_envelope_bytes: usize) -> Self {
        Self {
            gateway,
            max_envelope_bytes,
        }
    }

    /// Process one inbound frame. Errors are reported to the client here;
    /// the caller never needs to act on them.
    pub async fn dispatch(
        &self,
        connection_id: ConnectionId,
        state: &mut ConnectionState,
        raw: &str,
    ) {
        if let Err(e) = self.dispatch_inner(connection_id, state, raw).await {
            if let GatewayError::Infrastructure(ref msg) = e {
                log::error!("Store failure while serving {}: {}", connection_id, msg);
            }
            let reply = ServerMessage::from_error(&e);
            self.gateway.send_to(connection_id, &reply).await;
        }
    }

    async fn dispatch_inner(
        &self,
        connection_id: ConnectionId,
        state: &mut ConnectionState,
        raw: &str,
    ) -> Result<()> {
        if raw.len() > self.max_envelope_bytes {
            log::warn!(
                "Oversized envelope from {}: {} bytes",
                connection_id,
                raw.len()
            );
            return Err(GatewayError::Protocol("envelope too large".to_string()));
        }

        let envelope = Envelope::parse(raw)?;
        let message = ClientMessage::from_envelope(envelope)?;

        match message {
            ClientMessage::Auth { token } => self.handle_auth(connection_id, state, &token).await,
            ClientMessage::JoinProject { project_id } => {
                self.handle_join(connection_id, state, &project_id).await
            }
            ClientMessage::LeaveProject { project_id } => {
                self.handle_leave(connection_id, state, &project_id).await
            }
            ClientMessage::ProjectUpdate(payload) => {
                self.relay(connection_id, state, payload, RelayKind::ProjectUpdate)
                    .await
            }
            ClientMessage::CodeChange(payload) => {
                self.relay(connection_id, state, payload, RelayKind::CodeChange)
                    .await
            }
            ClientMessage::CursorPosition(payload) => {
                self.relay(connection_id, state, payload, RelayKind::CursorPosition)
                    .await
            }
            ClientMessage::Ping => {
                self.gateway
                    .send_to(connection_id, &ServerMessage::Pong {})
                    .await;
                Ok(())
            }
        }
    }

    async fn handle_auth(
        &self,
        connection_id: ConnectionId,
        state: &mut ConnectionState,
        token: &str,
    ) -> Result<()> {
        // A failed attempt leaves the current state untouched
        let identity = self.gateway.authenticate(connection_id, token).await?;

        // Re-authenticating while in a room leaves it first: room access was
        // checked for the previous identity
        if let ConnectionState::InRoom { .. } = state {
            if let Some(room) = self.gateway.leave_project(connection_id).await {
                if let Some(previous) = state.identity() {
                    let notice = ServerMessage::UserLeft {
                        user_id: previous.user_id.clone(),
                        project_id: room.clone(),
                    };
                    self.gateway
                        .broadcast_to_room(&room, &notice, Some(connection_id))
                        .await;
                }
            }
        }

        log::info!(
            "Connection {} authenticated as user {}",
            connection_id,
            identity.user_id
        );

        let reply = ServerMessage::AuthSuccess {
            user_id: identity.user_id.clone(),
            email: identity.email.clone(),
            display_name: identity.display_name.clone(),
        };
        *state = ConnectionState::Authenticated(identity);
        self.gateway.send_to(connection_id, &reply).await;
        Ok(())
    }

    async fn handle_join(
        &self,
        connection_id: ConnectionId,
        state: &mut ConnectionState,
        project_id: &str,
    ) -> Result<()> {
        let identity = require_identity(state)?.clone();

        let outcome = self
            .gateway
            .join_project(connection_id, &identity.user_id, project_id)
            .await?;

        // Auto-left a previous room: tell its remaining members
        if let Some(previous_room) = outcome.previous_room {
            let notice = ServerMessage::UserLeft {
                user_id: identity.user_id.clone(),
                project_id: previous_room.clone(),
            };
            self.gateway
                .broadcast_to_room(&previous_room, &notice, Some(connection_id))
                .await;
        }

        *state = ConnectionState::InRoom {
            identity: identity.clone(),
            project_id: project_id.to_string(),
        };

        let reply = ServerMessage::ProjectJoined {
            project_id: project_id.to_string(),
            project_name: outcome.project_name,
        };
        self.gateway.send_to(connection_id, &reply).await;

        let notice = ServerMessage::UserJoined {
            user_id: identity.user_id,
            project_id: project_id.to_string(),
        };
        self.gateway
            .broadcast_to_room(project_id, &notice, Some(connection_id))
            .await;

        Ok(())
    }

    async fn handle_leave(
        &self,
        connection_id: ConnectionId,
        state: &mut ConnectionState,
        project_id: &str,
    ) -> Result<()> {
        let identity = require_identity(state)?.clone();

        // Idempotent: leaving while not in a room still gets a reply
        if let Some(room) = self.gateway.leave_project(connection_id).await {
            let notice = ServerMessage::UserLeft {
                user_id: identity.user_id.clone(),
                project_id: room.clone(),
            };
            self.gateway
                .broadcast_to_room(&room, &notice, Some(connection_id))
                .await;
        }

        *state = ConnectionState::Authenticated(identity);

        let reply = ServerMessage::ProjectLeft {
            project_id: project_id.to_string(),
        };
        self.gateway.send_to(connection_id, &reply).await;
        Ok(())
    }

    /// Relay a collaboration payload to the sender's room, stamped with the
    /// sender's user id and a server-assigned timestamp
    async fn relay(
        &self,
        connection_id: ConnectionId,
        state: &mut ConnectionState,
        payload: Value,
        kind: RelayKind,
    ) -> Result<()> {
        let identity = require_identity(state)?;

        let room = match state.room() {
            Some(room) => room.to_string(),
            None => {
                return Err(GatewayError::Authorization(
                    "not collaborating on any project".to_string(),
                ))
            }
        };

        let stamped = stamp_payload(payload, &identity.user_id)?;
        let message = match kind {
            RelayKind::ProjectUpdate => ServerMessage::ProjectUpdated(stamped),
            RelayKind::CodeChange => ServerMessage::CodeChanged(stamped),
            RelayKind::CursorPosition => ServerMessage::CursorMoved(stamped),
        };

        self.gateway
            .broadcast_to_room(&room, &message, Some(connection_id))
            .await;
        Ok(())
    }
}

enum RelayKind {
    ProjectUpdate,
    CodeChange,
    CursorPosition,
}

/// Privileged operations need a verified identity first
fn require_identity(state: &ConnectionState) -> Result<&crate::auth::VerifiedIdentity> {
    state.identity().ok_or_else(|| {
        GatewayError::Privilege("authenticate before issuing this operation".to_string())
    })
}
