//! User session lifecycle.
//!
//! Sessions slide: activity pushes the expiry forward by the
//! configured TTL, but never past the hard cap fixed at open. Revoking
//! a session cascades to every refresh chain bound to it.

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::config::SessionConfig;
use crate::error::AuthError;
use crate::storage::SessionStorage;
use crate::token::TokenService;
use crate::types::Session;

/// Parameters for opening a session.
#[derive(Debug, Clone, Default)]
pub struct OpenSessionRequest {
    /// Client that established the session, if known.
    pub client_id: Option<String>,
    /// Human-readable device description, if reported.
    pub device_name: Option<String>,
    /// Client IP, if known.
    pub ip_address: Option<String>,
}

/// Service owning session state.
pub struct SessionService {
    sessions: Arc<dyn SessionStorage>,
    tokens: Arc<TokenService>,
    config: SessionConfig,
}

impl SessionService {
    /// Creates a new session service.
    pub fn new(
        sessions: Arc<dyn SessionStorage>,
        tokens: Arc<TokenService>,
        config: SessionConfig,
    ) -> Self {
        Self {
            sessions,
            tokens,
            config,
        }
    }

    /// Opens a session for an authenticated user.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn open(
        &self,
        orbit_id: Uuid,
        user_id: Uuid,
        request: OpenSessionRequest,
    ) -> AuthResult<Session> {
        let now = OffsetDateTime::now_utc();
        let max_expires_at = now + self.config.max_lifetime;

        let session = Session {
            id: Uuid::new_v4(),
            orbit_id,
            user_id,
            client_id: request.client_id,
            device_name: request.device_name,
            ip_address: request.ip_address,
            started_at: now,
            last_active_at: now,
            expires_at: (now + self.config.ttl).min(max_expires_at),
            max_expires_at,
            revoked_at: None,
        };
        self.sessions.create(&session).await?;

        tracing::debug!(orbit_id = %orbit_id, session_id = %session.id, "Session opened");
        Ok(session)
    }

    /// Records activity on a session, sliding its expiry when the
    /// sliding window is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is unknown, revoked, or expired.
    pub async fn touch(&self, orbit_id: Uuid, id: Uuid) -> AuthResult<Session> {
        let session = self
            .sessions
            .find_by_id(orbit_id, id)
            .await?
            .ok_or_else(|| AuthError::not_found("session"))?;

        if session.is_revoked() {
            return Err(AuthError::Revoked);
        }
        if session.is_expired() {
            return Err(AuthError::Expired);
        }

        let now = OffsetDateTime::now_utc();
        let expires_at = if self.config.sliding_window {
            (now + self.config.ttl).min(session.max_expires_at)
        } else {
            session.expires_at
        };

        if !self.sessions.touch(orbit_id, id, now, expires_at).await? {
            // Revoked or expired between the read and the write.
            return Err(AuthError::Revoked);
        }

        Ok(Session {
            last_active_at: now,
            expires_at,
            ..session
        })
    }

    /// Revokes a session and every refresh chain bound to it.
    ///
    /// Revoking an already-revoked session is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is unknown or storage fails.
    pub async fn revoke(&self, orbit_id: Uuid, id: Uuid, reason: &str) -> AuthResult<()> {
        if self
            .sessions
            .find_by_id(orbit_id, id)
            .await?
            .is_none()
        {
            return Err(AuthError::not_found("session"));
        }

        self.sessions
            .revoke(orbit_id, id, OffsetDateTime::now_utc())
            .await?;
        let revoked = self.tokens.revoke_session_tokens(orbit_id, id, reason).await?;

        tracing::info!(
            orbit_id = %orbit_id,
            session_id = %id,
            chains_revoked = revoked,
            reason = %reason,
            "Session revoked"
        );
        Ok(())
    }

    /// Signs a user out everywhere: revokes every session and every
    /// refresh chain the user holds, including chains issued without a
    /// session. Returns the number of sessions revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn revoke_all_for_user(
        &self,
        orbit_id: Uuid,
        user_id: Uuid,
        reason: &str,
    ) -> AuthResult<u64> {
        let sessions = self.sessions.list_by_user(orbit_id, user_id).await?;
        let mut revoked = 0;
        for session in &sessions {
            if session.is_revoked() {
                continue;
            }
            self.sessions
                .revoke(orbit_id, session.id, OffsetDateTime::now_utc())
                .await?;
            self.tokens
                .revoke_session_tokens(orbit_id, session.id, reason)
                .await?;
            revoked += 1;
        }

        // Sessionless chains are not reached by the per-session pass
        let chains = self.tokens.revoke_user_tokens(orbit_id, user_id, reason).await?;

        tracing::info!(
            orbit_id = %orbit_id,
            user_id = %user_id,
            sessions_revoked = revoked,
            chains_revoked = chains,
            "Global sign-out"
        );
        Ok(revoked)
    }

    /// Lists a user's sessions, including inactive ones.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn list(&self, orbit_id: Uuid, user_id: Uuid) -> AuthResult<Vec<Session>> {
        self.sessions.list_by_user(orbit_id, user_id).await
    }
}
