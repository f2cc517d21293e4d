//! In-memory TOTP and recovery code stores.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use orbit_auth::error::AuthError;
use orbit_auth::storage::{RecoveryCodeStorage, TotpStorage};
use orbit_auth::types::{RecoveryCode, TotpSecret};
use orbit_auth::AuthResult;

/// TOTP enrollments keyed by (orbit, user).
#[derive(Default)]
pub struct InMemoryTotpStore {
    secrets: RwLock<HashMap<(Uuid, Uuid), TotpSecret>>,
}

impl InMemoryTotpStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TotpStorage for InMemoryTotpStore {
    async fn create(&self, secret: &TotpSecret) -> AuthResult<()> {
        let mut secrets = self.secrets.write().unwrap();
        let key = (secret.orbit_id, secret.user_id);
        if secrets.contains_key(&key) {
            return Err(AuthError::conflict("User already has an enrollment"));
        }
        secrets.insert(key, secret.clone());
        Ok(())
    }

    async fn find_by_user(&self, orbit_id: Uuid, user_id: Uuid) -> AuthResult<Option<TotpSecret>> {
        let secrets = self.secrets.read().unwrap();
        Ok(secrets.get(&(orbit_id, user_id)).cloned())
    }

    async fn confirm(&self, orbit_id: Uuid, id: Uuid) -> AuthResult<bool> {
        let mut secrets = self.secrets.write().unwrap();
        for secret in secrets.values_mut() {
            if secret.orbit_id == orbit_id && secret.id == id {
                if secret.confirmed {
                    return Ok(false);
                }
                secret.confirmed = true;
                secret.updated_at = OffsetDateTime::now_utc();
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn advance_step(&self, orbit_id: Uuid, id: Uuid, step: i64) -> AuthResult<bool> {
        // Compare and advance under one write lock; the step is
        // strictly monotonic.
        let mut secrets = self.secrets.write().unwrap();
        for secret in secrets.values_mut() {
            if secret.orbit_id == orbit_id && secret.id == id {
                if step <= secret.last_step {
                    return Ok(false);
                }
                secret.last_step = step;
                secret.updated_at = OffsetDateTime::now_utc();
                return Ok(true);
            }
        }
        Err(AuthError::not_found("TOTP enrollment"))
    }

    async fn delete_by_user(&self, orbit_id: Uuid, user_id: Uuid) -> AuthResult<bool> {
        let mut secrets = self.secrets.write().unwrap();
        Ok(secrets.remove(&(orbit_id, user_id)).is_some())
    }
}

/// Recovery codes, scanned linearly; batches are small.
#[derive(Default)]
pub struct InMemoryRecoveryCodeStore {
    codes: RwLock<Vec<RecoveryCode>>,
}

impl InMemoryRecoveryCodeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecoveryCodeStorage for InMemoryRecoveryCodeStore {
    async fn create_batch(&self, batch: &[RecoveryCode]) -> AuthResult<()> {
        let mut codes = self.codes.write().unwrap();
        codes.extend_from_slice(batch);
        Ok(())
    }

    async fn consume(&self, orbit_id: Uuid, user_id: Uuid, code_hash: &str) -> AuthResult<bool> {
        let mut codes = self.codes.write().unwrap();
        for code in codes.iter_mut() {
            if code.orbit_id == orbit_id
                && code.user_id == user_id
                && code.code_hash == code_hash
                && code.used_at.is_none()
            {
                code.used_at = Some(OffsetDateTime::now_utc());
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn count_unused(&self, orbit_id: Uuid, user_id: Uuid) -> AuthResult<u64> {
        let codes = self.codes.read().unwrap();
        Ok(codes
            .iter()
            .filter(|c| c.orbit_id == orbit_id && c.user_id == user_id && c.used_at.is_none())
            .count() as u64)
    }

    async fn delete_by_user(&self, orbit_id: Uuid, user_id: Uuid) -> AuthResult<u64> {
        let mut codes = self.codes.write().unwrap();
        let before = codes.len();
        codes.retain(|c| !(c.orbit_id == orbit_id && c.user_id == user_id));
        Ok((before - codes.len()) as u64)
    }
}
