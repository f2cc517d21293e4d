//! In-memory access and refresh token stores.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use orbit_auth::error::AuthError;
use orbit_auth::storage::{AccessTokenStorage, RefreshTokenStorage};
use orbit_auth::types::{AccessToken, RefreshToken};
use orbit_auth::AuthResult;

/// Access token records keyed by (orbit, JTI).
#[derive(Default)]
pub struct InMemoryAccessTokenStore {
    tokens: RwLock<HashMap<(Uuid, String), AccessToken>>,
}

impl InMemoryAccessTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccessTokenStorage for InMemoryAccessTokenStore {
    async fn create(&self, token: &AccessToken) -> AuthResult<()> {
        let mut tokens = self.tokens.write().unwrap();
        let key = (token.orbit_id, token.jti.clone());
        if tokens.contains_key(&key) {
            return Err(AuthError::conflict("JTI already exists"));
        }
        tokens.insert(key, token.clone());
        Ok(())
    }

    async fn find_by_jti(&self, orbit_id: Uuid, jti: &str) -> AuthResult<Option<AccessToken>> {
        let tokens = self.tokens.read().unwrap();
        Ok(tokens.get(&(orbit_id, jti.to_string())).cloned())
    }

    async fn revoke(&self, orbit_id: Uuid, jti: &str, at: OffsetDateTime) -> AuthResult<bool> {
        let mut tokens = self.tokens.write().unwrap();
        match tokens.get_mut(&(orbit_id, jti.to_string())) {
            Some(t) if t.revoked_at.is_none() => {
                t.revoked_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_by_refresh_token(
        &self,
        orbit_id: Uuid,
        refresh_token_id: Uuid,
    ) -> AuthResult<Vec<AccessToken>> {
        let tokens = self.tokens.read().unwrap();
        Ok(tokens
            .values()
            .filter(|t| t.orbit_id == orbit_id && t.refresh_token_id == Some(refresh_token_id))
            .cloned()
            .collect())
    }

    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let mut tokens = self.tokens.write().unwrap();
        let before = tokens.len();
        tokens.retain(|_, t| t.expires_at >= now);
        Ok((before - tokens.len()) as u64)
    }
}

/// Refresh token records keyed by record ID, with a hash index scan.
#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    tokens: RwLock<HashMap<Uuid, RefreshToken>>,
}

impl InMemoryRefreshTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStorage for InMemoryRefreshTokenStore {
    async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
        let mut tokens = self.tokens.write().unwrap();
        let duplicate = tokens
            .values()
            .any(|t| t.orbit_id == token.orbit_id && t.token_hash == token.token_hash);
        if duplicate {
            return Err(AuthError::conflict("Token hash already exists"));
        }
        tokens.insert(token.id, token.clone());
        Ok(())
    }

    async fn find_by_hash(
        &self,
        orbit_id: Uuid,
        token_hash: &str,
    ) -> AuthResult<Option<RefreshToken>> {
        let tokens = self.tokens.read().unwrap();
        Ok(tokens
            .values()
            .find(|t| t.orbit_id == orbit_id && t.token_hash == token_hash)
            .cloned())
    }

    async fn find_by_id(&self, orbit_id: Uuid, id: Uuid) -> AuthResult<Option<RefreshToken>> {
        let tokens = self.tokens.read().unwrap();
        Ok(tokens.get(&id).filter(|t| t.orbit_id == orbit_id).cloned())
    }

    async fn begin_rotation(
        &self,
        orbit_id: Uuid,
        id: Uuid,
        successor_id: Uuid,
        at: OffsetDateTime,
    ) -> AuthResult<bool> {
        // Revocation and successor link land in one step under the
        // write lock; concurrent rotations of the same token see
        // exactly one winner.
        let mut tokens = self.tokens.write().unwrap();
        match tokens.get_mut(&id) {
            Some(t)
                if t.orbit_id == orbit_id
                    && t.revoked_at.is_none()
                    && t.rotated_to.is_none() =>
            {
                t.revoked_at = Some(at);
                t.rotated_to = Some(successor_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke(&self, orbit_id: Uuid, id: Uuid, at: OffsetDateTime) -> AuthResult<bool> {
        let mut tokens = self.tokens.write().unwrap();
        match tokens.get_mut(&id) {
            Some(t) if t.orbit_id == orbit_id && t.revoked_at.is_none() => {
                t.revoked_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_use(&self, orbit_id: Uuid, id: Uuid, at: OffsetDateTime) -> AuthResult<()> {
        let mut tokens = self.tokens.write().unwrap();
        match tokens.get_mut(&id) {
            Some(t) if t.orbit_id == orbit_id => {
                t.use_count += 1;
                t.last_used_at = Some(at);
                Ok(())
            }
            _ => Err(AuthError::not_found("refresh token")),
        }
    }

    async fn list_by_session(
        &self,
        orbit_id: Uuid,
        session_id: Uuid,
    ) -> AuthResult<Vec<RefreshToken>> {
        let tokens = self.tokens.read().unwrap();
        Ok(tokens
            .values()
            .filter(|t| t.orbit_id == orbit_id && t.session_id == Some(session_id))
            .cloned()
            .collect())
    }

    async fn list_by_user(&self, orbit_id: Uuid, user_id: Uuid) -> AuthResult<Vec<RefreshToken>> {
        let tokens = self.tokens.read().unwrap();
        Ok(tokens
            .values()
            .filter(|t| t.orbit_id == orbit_id && t.user_id == Some(user_id))
            .cloned()
            .collect())
    }

    async fn list_by_user_client(
        &self,
        orbit_id: Uuid,
        user_id: Uuid,
        client_id: &str,
    ) -> AuthResult<Vec<RefreshToken>> {
        let tokens = self.tokens.read().unwrap();
        Ok(tokens
            .values()
            .filter(|t| {
                t.orbit_id == orbit_id && t.user_id == Some(user_id) && t.client_id == client_id
            })
            .cloned()
            .collect())
    }

    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let mut tokens = self.tokens.write().unwrap();
        let before = tokens.len();
        tokens.retain(|_, t| t.expires_at >= now);
        Ok((before - tokens.len()) as u64)
    }
}
