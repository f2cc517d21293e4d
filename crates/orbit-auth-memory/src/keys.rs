//! In-memory signing key store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use orbit_auth::error::AuthError;
use orbit_auth::storage::SigningKeyStorage;
use orbit_auth::types::SigningKey;
use orbit_auth::AuthResult;

/// Signing keys keyed by record ID.
#[derive(Default)]
pub struct InMemorySigningKeyStore {
    keys: RwLock<HashMap<Uuid, SigningKey>>,
}

impl InMemorySigningKeyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SigningKeyStorage for InMemorySigningKeyStore {
    async fn create(&self, key: &SigningKey) -> AuthResult<()> {
        let mut keys = self.keys.write().unwrap();
        let duplicate = keys
            .values()
            .any(|k| k.orbit_id == key.orbit_id && k.kid == key.kid);
        if duplicate {
            return Err(AuthError::conflict("kid already exists in orbit"));
        }
        keys.insert(key.id, key.clone());
        Ok(())
    }

    async fn find_by_kid(&self, orbit_id: Uuid, kid: &str) -> AuthResult<Option<SigningKey>> {
        let keys = self.keys.read().unwrap();
        Ok(keys
            .values()
            .find(|k| k.orbit_id == orbit_id && k.kid == kid)
            .cloned())
    }

    async fn list(&self, orbit_id: Uuid) -> AuthResult<Vec<SigningKey>> {
        let keys = self.keys.read().unwrap();
        Ok(keys
            .values()
            .filter(|k| k.orbit_id == orbit_id)
            .cloned()
            .collect())
    }

    async fn shorten_window(
        &self,
        orbit_id: Uuid,
        id: Uuid,
        expires_at: OffsetDateTime,
    ) -> AuthResult<()> {
        let mut keys = self.keys.write().unwrap();
        match keys.get_mut(&id) {
            Some(k) if k.orbit_id == orbit_id => {
                if expires_at > k.expires_at {
                    return Err(AuthError::invalid_state(
                        "Key validity window may only shrink",
                    ));
                }
                k.expires_at = expires_at;
                Ok(())
            }
            _ => Err(AuthError::not_found("signing key")),
        }
    }

    async fn deactivate(&self, orbit_id: Uuid, id: Uuid) -> AuthResult<bool> {
        let mut keys = self.keys.write().unwrap();
        match keys.get_mut(&id) {
            Some(k) if k.orbit_id == orbit_id && k.active => {
                k.active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
