//! External collaborator stores consumed by the gateway

pub mod memory;
pub mod traits;

pub use memory::{MemoryProjectStore, MemorySessionStore, ProjectRecord};
pub use traits::{AccessDecision, ProjectStore, SessionRecord, SessionStore};
