//! Bearer credential verification
//!
//! Verifies a token locally (signature, format, expiry), then confirms the
//! embedded session against the external session store. Never mutates the
//! store; binding the identity to a connection is the gateway's job.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::token::TokenManager;
use crate::error::{AuthFailure, GatewayError, Result};
use crate::stores::traits::SessionStore;

/// Identity produced by a successful credential check
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub user_id: String,
    pub session_id: String,
    pub email: String,
    pub display_name: String,
}

pub struct Authenticator {
    tokens: TokenManager,
    sessions: Arc<dyn SessionStore>,
}

impl Authenticator {
    pub fn new(jwt_secret: &str, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            tokens: TokenManager::new(jwt_secret),
            sessions,
        }
    }

    /// Verify a bearer credential and return the identity it proves.
    ///
    /// Failure classification: signature/format problems and token expiry
    /// come out of the local decode; the session store then rules on session
    /// existence, session expiry, and account status. A token whose subject
    /// does not match the session record is treated as an unknown session.
    pub async fn verify(&self, token: &str) -> Result<VerifiedIdentity> {
        let claims = self.tokens.decode_token(token)?;

        let record = self
            .sessions
            .fetch_session(&claims.sid)
            .await?
            .ok_or(GatewayError::Auth(AuthFailure::UnknownSession))?;

        if record.user_id != claims.sub {
            return Err(GatewayError::Auth(AuthFailure::UnknownSession));
        }
        if record.expires_at <= Utc::now() {
            return Err(GatewayError::Auth(AuthFailure::Expired));
        }
        if !record.account_active {
            return Err(GatewayError::Auth(AuthFailure::InactiveAccount));
        }

        Ok(VerifiedIdentity {
            user_id: record.user_id,
            session_id: claims.sid,
            email: record.email,
            display_name: record.display_name,
        })
    }
}
