use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AuthFailure, GatewayError, Result};

/// JWT claims embedded in a bearer credential
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Session ID, confirmed against the session store
    pub sid: String,
    /// Expiration time (as UTC timestamp)
    pub exp: usize,
    /// Issued at (as UTC timestamp)
    pub iat: usize,
}

impl Claims {
    /// Creates new claims binding a user to a session
    pub fn new(user_id: String, session_id: String) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_secs() as usize;

        Self {
            sub: user_id,
            sid: session_id,
            exp: now + 86400, // 24 hours from now
            iat: now,
        }
    }

    /// Creates claims with custom expiration in seconds
    pub fn with_expiration(user_id: String, session_id: String, seconds: usize) -> Self {
        let mut claims = Self::new(user_id, session_id);
        claims.exp = claims.iat + seconds;
        claims
    }
}

/// Manages bearer token signing and validation
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenManager {
    /// Creates a new token manager with a signing secret
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    /// Generates a signed token for the given claims
    pub fn generate_token(&self, claims: &Claims) -> Result<String> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| GatewayError::ConfigError(format!("Failed to generate token: {}", e)))
    }

    /// Validates signature and expiry, returning the embedded claims.
    /// Failures are classified so the client receives a precise `auth_error`.
    pub fn decode_token(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => GatewayError::Auth(AuthFailure::Expired),
                _ => GatewayError::Auth(AuthFailure::Malformed),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let manager = TokenManager::new("test-signing-secret");
        let claims = Claims::new("user-1".to_string(), "session-1".to_string());

        let token = manager.generate_token(&claims).unwrap();
        let decoded = manager.decode_token(&token).unwrap();

        assert_eq!(decoded.sub, "user-1");
        assert_eq!(decoded.sid, "session-1");
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let manager = TokenManager::new("test-signing-secret");
        match manager.decode_token("not.a.token") {
            Err(GatewayError::Auth(AuthFailure::Malformed)) => {}
            other => panic!("expected malformed classification, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_expired_token_is_classified() {
        let manager = TokenManager::new("test-signing-secret");
        let mut claims = Claims::new("user-1".to_string(), "session-1".to_string());
        claims.exp = claims.iat.saturating_sub(3600);

        let token = manager.generate_token(&claims).unwrap();
        match manager.decode_token(&token) {
            Err(GatewayError::Auth(AuthFailure::Expired)) => {}
            other => panic!("expected expired classification, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let manager = TokenManager::new("test-signing-secret");
        let claims = Claims::new("user-1".to_string(), "session-1".to_string());
        let token = manager.generate_token(&claims).unwrap();

        let other = TokenManager::new("different-signing-secret");
        assert!(other.decode_token(&token).is_err());
    }
}
