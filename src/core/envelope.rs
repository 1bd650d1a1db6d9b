//! Wire envelope parsing and outbound message types
//!
//! Every frame, both directions, is `{ "type": <string>, "payload": <object>,
//! "roomId"?: <string> }`. Payloads of relayed messages are opaque beyond the
//! control fields the gateway stamps into them.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GatewayError, Result};

/// Raw inbound frame, before the type field is interpreted
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "roomId")]
    pub room_id: Option<String>,
}

impl Envelope {
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| GatewayError::Protocol(format!("malformed envelope: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
struct AuthPayload {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ProjectPayload {
    #[serde(rename = "projectId")]
    project_id: String,
}

/// Interpreted client message, one variant per recognized envelope type
#[derive(Debug)]
pub enum ClientMessage {
    Auth { token: String },
    JoinProject { project_id: String },
    LeaveProject { project_id: String },
    ProjectUpdate(Value),
    CodeChange(Value),
    CursorPosition(Value),
    Ping,
}

impl ClientMessage {
    /// Interpret an envelope. Unknown types and payloads missing their
    /// control fields are protocol errors; the connection stays open.
    pub fn from_envelope(envelope: Envelope) -> Result<Self> {
        match envelope.kind.as_str() {
            "auth" => {
                let payload: AuthPayload = decode_payload(envelope.payload, "auth")?;
                Ok(Self::Auth {
                    token: payload.token,
                })
            }
            "join_project" => {
                let payload: ProjectPayload = decode_payload(envelope.payload, "join_project")?;
                Ok(Self::JoinProject {
                    project_id: payload.project_id,
                })
            }
            "leave_project" => {
                let payload: ProjectPayload = decode_payload(envelope.payload, "leave_project")?;
                Ok(Self::LeaveProject {
                    project_id: payload.project_id,
                })
            }
            "project_update" => Ok(Self::ProjectUpdate(envelope.payload)),
            "code_change" => Ok(Self::CodeChange(envelope.payload)),
            "cursor_position" => Ok(Self::CursorPosition(envelope.payload)),
            "ping" => Ok(Self::Ping),
            other => Err(GatewayError::Protocol(format!(
                "unrecognized message type: {}",
                other
            ))),
        }
    }
}

fn decode_payload<T: serde::de::DeserializeOwned>(payload: Value, kind: &str) -> Result<T> {
    serde_json::from_value(payload)
        .map_err(|e| GatewayError::Protocol(format!("invalid {} payload: {}", kind, e)))
}

/// Server-to-client message types
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    #[serde(rename = "auth_success")]
    AuthSuccess {
        #[serde(rename = "userId")]
        user_id: String,
        email: String,
        #[serde(rename = "displayName")]
        display_name: String,
    },

    #[serde(rename = "auth_error")]
    AuthError { message: String },

    #[serde(rename = "project_joined")]
    ProjectJoined {
        #[serde(rename = "projectId")]
        project_id: String,
        #[serde(rename = "projectName")]
        project_name: String,
    },

    #[serde(rename = "project_left")]
    ProjectLeft {
        #[serde(rename = "projectId")]
        project_id: String,
    },

    #[serde(rename = "error")]
    Error { message: String },

    #[serde(rename = "user_joined")]
    UserJoined {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "projectId")]
        project_id: String,
    },

    #[serde(rename = "user_left")]
    UserLeft {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "projectId")]
        project_id: String,
    },

    /// Relayed project-state update, payload stamped with sender and time
    #[serde(rename = "project_updated")]
    ProjectUpdated(Value),

    #[serde(rename = "code_changed")]
    CodeChanged(Value),

    #[serde(rename = "cursor_moved")]
    CursorMoved(Value),

    #[serde(rename = "pong")]
    Pong {},
}

impl ServerMessage {
    /// Reply for a failed operation, mapped from the error taxonomy:
    /// auth failures get their own type so clients can re-authenticate.
    pub fn from_error(err: &GatewayError) -> Self {
        match err {
            GatewayError::Auth(failure) => Self::AuthError {
                message: failure.to_string(),
            },
            other => Self::Error {
                message: other.to_string(),
            },
        }
    }
}

/// Stamp a relayed payload with the sender's user id and a server-assigned
/// timestamp. Non-object payloads are rejected as protocol errors.
pub fn stamp_payload(payload: Value, user_id: &str) -> Result<Value> {
    match payload {
        Value::Object(mut map) => {
            map.insert("userId".to_string(), Value::String(user_id.to_string()));
            map.insert(
                "timestamp".to_string(),
                Value::String(Utc::now().to_rfc3339()),
            );
            Ok(Value::Object(map))
        }
        _ => Err(GatewayError::Protocol(
            "relay payload must be an object".to_string(),
        )),
    }
}
