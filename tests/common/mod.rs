//! Shared harness for gateway behaviour tests
//!
//! Connections are in-process: each test connection is a registered handle
//! whose outbound channel the test holds, standing in for the socket
//! forwarding task. Dispatching through the router is deterministic because
//! all delivery happens before `dispatch` returns.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;
use warp::ws::Message;

use collab_gateway::auth::{Claims, TokenManager};
use collab_gateway::constants::MAX_ENVELOPE_BYTES;
use collab_gateway::core::connection::{ConnectionHandle, ConnectionId, ConnectionState};
use collab_gateway::core::gateway::{Gateway, SharedGateway};
use collab_gateway::core::router::MessageRouter;
use collab_gateway::stores::{
    MemoryProjectStore, MemorySessionStore, ProjectRecord, SessionRecord,
};

pub const TEST_SECRET: &str = "behaviour-test-signing-secret-0123456789";

pub struct TestHarness {
    pub gateway: SharedGateway,
    pub router: MessageRouter,
    pub sessions: Arc<MemorySessionStore>,
    pub projects: Arc<MemoryProjectStore>,
    pub tokens: TokenManager,
}

pub fn harness() -> TestHarness {
    let sessions = Arc::new(MemorySessionStore::new());
    let projects = Arc::new(MemoryProjectStore::new());
    let gateway: SharedGateway = Arc::new(Gateway::new(
        TEST_SECRET,
        sessions.clone(),
        projects.clone(),
    ));
    let router = MessageRouter::new(gateway.clone(), MAX_ENVELOPE_BYTES);

    TestHarness {
        gateway,
        router,
        sessions,
        projects,
        tokens: TokenManager::new(TEST_SECRET),
    }
}

impl TestHarness {
    /// Register a connection and hand its outbound channel to the test
    pub async fn connect(&self) -> TestConnection {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.gateway
            .register_connection(ConnectionHandle::new(id, tx))
            .await;
        TestConnection {
            id,
            rx,
            state: ConnectionState::Connected,
        }
    }

    /// Seed an active session and mint a matching bearer token
    pub async fn seed_user(&self, user_id: &str, session_id: &str) -> String {
        self.sessions
            .insert_session(
                session_id.to_string(),
                SessionRecord {
                    user_id: user_id.to_string(),
                    email: format!("{}@example.com", user_id),
                    display_name: format!("User {}", user_id),
                    expires_at: Utc::now() + Duration::hours(1),
                    account_active: true,
                },
            )
            .await;

        let claims = Claims::new(user_id.to_string(), session_id.to_string());
        self.tokens.generate_token(&claims).unwrap()
    }

    pub async fn seed_project(&self, project_id: &str, name: &str, owner: &str, public: bool) {
        self.projects
            .insert_project(
                project_id.to_string(),
                ProjectRecord {
                    name: name.to_string(),
                    owner_id: owner.to_string(),
                    public,
                },
            )
            .await;
    }

    pub async fn dispatch(&self, conn: &mut TestConnection, raw: &str) {
        self.router.dispatch(conn.id, &mut conn.state, raw).await;
    }

    /// Authenticate a connection and assert success
    pub async fn authenticate(&self, conn: &mut TestConnection, token: &str) {
        let frame = format!(r#"{{"type":"auth","payload":{{"token":"{}"}}}}"#, token);
        self.dispatch(conn, &frame).await;
        let reply = conn.next_message().expect("expected auth reply");
        assert_eq!(reply["type"], "auth_success", "auth failed: {}", reply);
    }

    /// Join a project and assert the grant
    pub async fn join(&self, conn: &mut TestConnection, project_id: &str) {
        let frame = format!(
            r#"{{"type":"join_project","payload":{{"projectId":"{}"}}}}"#,
            project_id
        );
        self.dispatch(conn, &frame).await;
        let reply = conn.next_message().expect("expected join reply");
        assert_eq!(reply["type"], "project_joined", "join failed: {}", reply);
    }
}

pub struct TestConnection {
    pub id: ConnectionId,
    pub rx: mpsc::UnboundedReceiver<Message>,
    pub state: ConnectionState,
}

impl TestConnection {
    /// Next queued application message, skipping transport frames
    pub fn next_message(&mut self) -> Option<Value> {
        while let Ok(frame) = self.rx.try_recv() {
            if let Ok(text) = frame.to_str() {
                return Some(serde_json::from_str(text).expect("outbound frame must be JSON"));
            }
        }
        None
    }

    /// All queued application messages
    pub fn drain(&mut self) -> Vec<Value> {
        let mut messages = Vec::new();
        while let Some(message) = self.next_message() {
            messages.push(message);
        }
        messages
    }
}
