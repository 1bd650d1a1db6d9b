use std::error::Error;
use std::fmt;

/// Classified authentication failures, surfaced to clients as `auth_error`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// Token failed signature or format validation
    Malformed,
    /// Token or backing session has expired
    Expired,
    /// Session id not known to the session store
    UnknownSession,
    /// User account exists but is deactivated
    InactiveAccount,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed credential"),
            Self::Expired => write!(f, "credential expired"),
            Self::UnknownSession => write!(f, "unknown session"),
            Self::InactiveAccount => write!(f, "account inactive"),
        }
    }
}

#[derive(Debug)]
pub enum GatewayError {
    // Protocol errors: malformed envelope or unrecognized type.
    // The connection stays open.
    Protocol(String),

    // Authentication errors
    Auth(AuthFailure),

    // Privileged operation attempted before authentication
    Privilege(String),

    // Room access denied by the project store
    Authorization(String),

    // External store unreachable or failed; client is expected to retry
    Infrastructure(String),

    // Connection errors
    ConnectionClosed,
    SendFailed(String),

    // Configuration errors
    ConfigError(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            Self::Auth(failure) => write!(f, "Authentication failed: {}", failure),
            Self::Privilege(msg) => write!(f, "Authentication required: {}", msg),
            Self::Authorization(msg) => write!(f, "Access denied: {}", msg),
            Self::Infrastructure(msg) => write!(f, "Service unavailable: {}", msg),
            Self::ConnectionClosed => write!(f, "Connection closed unexpectedly"),
            Self::SendFailed(id) => write!(f, "Failed to deliver to connection: {}", id),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for GatewayError {}

// Generic result type for the gateway
pub type Result<T> = std::result::Result<T, GatewayError>;
