//! Trait seams for the external collaborators consumed by the gateway
//!
//! The gateway never owns durable state. Session validity and project
//! visibility are resolved through these traits; the in-memory
//! implementations in `memory.rs` back the binary and the test suite, and
//! production deployments supply their own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Server-side record for one active session
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
    pub expires_at: DateTime<Utc>,
    pub account_active: bool,
}

/// Outcome of a project access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Granted { project_name: String },
    Denied,
}

/// Session/credential store: tracks which sessions are live.
/// The gateway only ever reads from it.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up a session by id; `None` when the session is unknown
    async fn fetch_session(&self, session_id: &str) -> Result<Option<SessionRecord>>;
}

/// Project store: resolves ownership and visibility for room-join checks
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Access is granted when the requester owns the project or the
    /// project is public
    async fn check_access(&self, project_id: &str, user_id: &str) -> Result<AccessDecision>;
}
