//! In-memory consent store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use orbit_auth::storage::ConsentStorage;
use orbit_auth::types::Consent;
use orbit_auth::AuthResult;

/// Consents keyed by (orbit, user, client); upsert replaces.
#[derive(Default)]
pub struct InMemoryConsentStore {
    consents: RwLock<HashMap<(Uuid, Uuid, String), Consent>>,
}

impl InMemoryConsentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConsentStorage for InMemoryConsentStore {
    async fn upsert(&self, consent: &Consent) -> AuthResult<()> {
        let mut consents = self.consents.write().unwrap();
        consents.insert(
            (consent.orbit_id, consent.user_id, consent.client_id.clone()),
            consent.clone(),
        );
        Ok(())
    }

    async fn find(
        &self,
        orbit_id: Uuid,
        user_id: Uuid,
        client_id: &str,
    ) -> AuthResult<Option<Consent>> {
        let consents = self.consents.read().unwrap();
        Ok(consents
            .get(&(orbit_id, user_id, client_id.to_string()))
            .cloned())
    }

    async fn revoke(&self, orbit_id: Uuid, id: Uuid, at: OffsetDateTime) -> AuthResult<bool> {
        let mut consents = self.consents.write().unwrap();
        for consent in consents.values_mut() {
            if consent.orbit_id == orbit_id && consent.id == id && consent.revoked_at.is_none() {
                consent.revoked_at = Some(at);
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn list_by_user(&self, orbit_id: Uuid, user_id: Uuid) -> AuthResult<Vec<Consent>> {
        let consents = self.consents.read().unwrap();
        Ok(consents
            .values()
            .filter(|c| c.orbit_id == orbit_id && c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let mut consents = self.consents.write().unwrap();
        let before = consents.len();
        consents.retain(|_, c| c.expires_at.is_none_or(|at| at >= now));
        Ok((before - consents.len()) as u64)
    }
}
