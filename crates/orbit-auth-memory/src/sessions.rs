//! In-memory session store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use orbit_auth::storage::SessionStorage;
use orbit_auth::types::Session;
use orbit_auth::AuthResult;

/// Sessions keyed by ID.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStore {
    async fn create(&self, session: &Session) -> AuthResult<()> {
        let mut sessions = self.sessions.write().unwrap();
        sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn find_by_id(&self, orbit_id: Uuid, id: Uuid) -> AuthResult<Option<Session>> {
        let sessions = self.sessions.read().unwrap();
        Ok(sessions.get(&id).filter(|s| s.orbit_id == orbit_id).cloned())
    }

    async fn touch(
        &self,
        orbit_id: Uuid,
        id: Uuid,
        last_active_at: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> AuthResult<bool> {
        let mut sessions = self.sessions.write().unwrap();
        match sessions.get_mut(&id) {
            Some(s)
                if s.orbit_id == orbit_id
                    && s.revoked_at.is_none()
                    && s.expires_at >= last_active_at =>
            {
                s.last_active_at = last_active_at;
                s.expires_at = expires_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke(&self, orbit_id: Uuid, id: Uuid, at: OffsetDateTime) -> AuthResult<bool> {
        let mut sessions = self.sessions.write().unwrap();
        match sessions.get_mut(&id) {
            Some(s) if s.orbit_id == orbit_id && s.revoked_at.is_none() => {
                s.revoked_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_by_user(&self, orbit_id: Uuid, user_id: Uuid) -> AuthResult<Vec<Session>> {
        let sessions = self.sessions.read().unwrap();
        Ok(sessions
            .values()
            .filter(|s| s.orbit_id == orbit_id && s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at >= now);
        Ok((before - sessions.len()) as u64)
    }
}
