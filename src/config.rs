//! Server configuration module
//! Handles runtime configuration parameters for the collaboration gateway

use crate::constants::{DEFAULT_HEARTBEAT_SECS, DEFAULT_HOST, DEFAULT_PORT, MAX_ENVELOPE_BYTES};
use crate::error::{GatewayError, Result};
use std::env;
use std::time::Duration;

/// Gateway configuration parameters
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Secret used to validate bearer token signatures
    pub jwt_secret: String,
    /// Interval between liveness sweeps (transport ping/pong)
    pub heartbeat_interval: Duration,
    /// Maximum accepted inbound envelope size in bytes
    pub max_envelope_bytes: usize,
    /// Development mode (seeds a demo session and project at startup)
    pub development_mode: bool,
}

impl GatewayConfig {
    /// Create a test configuration - only for tests, never for production
    #[cfg(test)]
    pub fn for_testing() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            jwt_secret: "unit-test-signing-secret-0123456789abcdef".to_string(),
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            max_envelope_bytes: MAX_ENVELOPE_BYTES,
            development_mode: true,
        }
    }

    /// Validate that the signing secret meets minimum requirements
    fn validate_jwt_secret(secret: &str) -> Result<()> {
        if secret.len() < 32 {
            return Err(GatewayError::ConfigError(
                "JWT secret must be at least 32 characters long".to_string(),
            ));
        }

        let insecure_patterns = ["your-secret-key", "change-this", "default", "password", "12345"];
        for pattern in &insecure_patterns {
            if secret.contains(pattern) {
                return Err(GatewayError::ConfigError(format!(
                    "JWT secret contains insecure pattern '{}'. Generate one with: openssl rand -base64 32",
                    pattern
                )));
            }
        }

        Ok(())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let host = env::var("COLLAB_GATEWAY_HOST").unwrap_or(DEFAULT_HOST.to_string());
        let port = env::var("COLLAB_GATEWAY_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let jwt_secret = env::var("COLLAB_GATEWAY_JWT_SECRET")
            .or_else(|_| env::var("JWT_SECRET"))
            .map_err(|_| {
                GatewayError::ConfigError(
                    "JWT_SECRET environment variable is required. \
                     Generate one with: openssl rand -base64 32"
                        .to_string(),
                )
            })?;
        Self::validate_jwt_secret(&jwt_secret)?;

        let heartbeat_secs = env::var("COLLAB_GATEWAY_HEARTBEAT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_HEARTBEAT_SECS);

        let max_envelope_bytes = env::var("COLLAB_GATEWAY_MAX_ENVELOPE_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(MAX_ENVELOPE_BYTES);

        let development_mode = env::var("COLLAB_GATEWAY_DEV_MODE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            host,
            port,
            jwt_secret,
            heartbeat_interval: Duration::from_secs(heartbeat_secs),
            max_envelope_bytes,
            development_mode,
        })
    }
}
