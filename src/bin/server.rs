use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use warp::Filter;

use collab_gateway::auth::{Claims, TokenManager};
use collab_gateway::config::GatewayConfig;
use collab_gateway::constants::WS_PATH;
use collab_gateway::core::gateway::{Gateway, SharedGateway};
use collab_gateway::core::router::MessageRouter;
use collab_gateway::handlers::websocket::handle_ws_client;
use collab_gateway::stores::{MemoryProjectStore, MemorySessionStore, ProjectRecord, SessionRecord};

#[tokio::main]
async fn main() {
    // Initialize env
    match dotenvy::dotenv() {
        Ok(_) => info!("Environment variables loaded from .env file"),
        Err(e) => warn!("No .env file loaded: {}", e),
    };

    // Initialize logging
    env_logger::init();

    // Load config
    let config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, port={}, heartbeat={:?}",
        config.host, config.port, config.heartbeat_interval
    );

    // The in-memory stores stand in for the external session and project
    // services; production deployments wire their own SessionStore and
    // ProjectStore implementations here.
    let sessions = Arc::new(MemorySessionStore::new());
    let projects = Arc::new(MemoryProjectStore::new());

    if config.development_mode {
        seed_development_data(&config, &sessions, &projects).await;
    }

    let gateway: SharedGateway = Arc::new(Gateway::new(
        &config.jwt_secret,
        sessions.clone(),
        projects.clone(),
    ));
    let router = Arc::new(MessageRouter::new(
        gateway.clone(),
        config.max_envelope_bytes,
    ));

    // Liveness monitor
    gateway.clone().start_heartbeat_task(config.heartbeat_interval);

    // WebSocket route
    let ws_gateway = gateway.clone();
    let ws_router = router.clone();
    let ws_route = warp::path(WS_PATH)
        .and(warp::ws())
        .map(move |ws: warp::ws::Ws| {
            let gateway = ws_gateway.clone();
            let router = ws_router.clone();
            info!("New websocket connection");
            ws.on_upgrade(move |socket| handle_ws_client(socket, gateway, router))
        });

    // Health check route
    let health_route = warp::path("health").map(|| "OK");

    let routes = ws_route.or(health_route);

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting collaboration gateway on {}", addr);

    warp::serve(routes).run(addr).await;
}

/// Seed a demo session and project so a development server is exercisable
/// out of the box. Logs a usable bearer token.
async fn seed_development_data(
    config: &GatewayConfig,
    sessions: &MemorySessionStore,
    projects: &MemoryProjectStore,
) {
    use chrono::{Duration, Utc};

    sessions
        .insert_session(
            "dev-session".to_string(),
            SessionRecord {
                user_id: "dev-user".to_string(),
                email: "dev@example.com".to_string(),
                display_name: "Dev User".to_string(),
                expires_at: Utc::now() + Duration::hours(24),
                account_active: true,
            },
        )
        .await;

    projects
        .insert_project(
            "dev-project".to_string(),
            ProjectRecord {
                name: "Dev Project".to_string(),
                owner_id: "dev-user".to_string(),
                public: false,
            },
        )
        .await;

    let tokens = TokenManager::new(&config.jwt_secret);
    let claims = Claims::new("dev-user".to_string(), "dev-session".to_string());
    match tokens.generate_token(&claims) {
        Ok(token) => info!("Development bearer token (user dev-user): {}", token),
        Err(e) => warn!("Failed to generate development token: {}", e),
    }
}
