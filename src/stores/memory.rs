//! In-memory store implementations
//!
//! Back the development binary and the test suite. All state is lost on
//! restart, which is acceptable: the stores these stand in for are external
//! services with their own durability.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::stores::traits::{AccessDecision, ProjectStore, SessionRecord, SessionStore};

/// In-memory session store
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a session record under the given session id
    pub async fn insert_session(&self, session_id: String, record: SessionRecord) {
        self.sessions.write().await.insert(session_id, record);
    }

    /// Drop a session, invalidating any tokens that reference it
    pub async fn revoke_session(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn fetch_session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }
}

/// Project metadata relevant to access checks
#[derive(Debug, Clone)]
pub struct ProjectRecord {
    pub name: String,
    pub owner_id: String,
    pub public: bool,
}

/// In-memory project store
pub struct MemoryProjectStore {
    projects: RwLock<HashMap<String, ProjectRecord>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self {
            projects: RwLock::new(HashMap::new()),
        }
    }

    pub async fn insert_project(&self, project_id: String, record: ProjectRecord) {
        self.projects.write().await.insert(project_id, record);
    }
}

impl Default for MemoryProjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn check_access(&self, project_id: &str, user_id: &str) -> Result<AccessDecision> {
        let projects = self.projects.read().await;
        match projects.get(project_id) {
            Some(record) if record.owner_id == user_id || record.public => {
                Ok(AccessDecision::Granted {
                    project_name: record.name.clone(),
                })
            }
            // Unknown projects are indistinguishable from forbidden ones
            _ => Ok(AccessDecision::Denied),
        }
    }
}
