//! Collab Gateway - real-time collaboration gateway for shared project
//! sessions
//!
//! Authenticated clients observe and relay live changes (edits, cursor
//! moves, project-state updates) over persistent WebSocket connections. The
//! gateway is a pure in-memory coordination layer: session validity and
//! project access are resolved through external store traits, and no durable
//! state lives here.

pub mod auth;
pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;
pub mod stores;

// Re-export main components
pub use config::GatewayConfig;
pub use constants::*;
