//! Core coordination logic for the collaboration gateway

pub mod connection;
pub mod directory;
pub mod envelope;
pub mod gateway;
pub mod registry;
pub mod router;

// Re-export main components for convenience
pub use connection::{ConnectionHandle, ConnectionId, ConnectionState};
pub use directory::RoomDirectory;
pub use envelope::{ClientMessage, Envelope, ServerMessage};
pub use gateway::{Disconnected, Gateway, JoinOutcome, SharedGateway};
pub use registry::ConnectionRegistry;
pub use router::MessageRouter;
