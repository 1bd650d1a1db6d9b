//! Authentication module

pub mod authenticator;
pub mod token;

// Re-export main components
pub use authenticator::{Authenticator, VerifiedIdentity};
pub use token::{Claims, TokenManager};
