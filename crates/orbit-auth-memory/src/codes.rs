//! In-memory authorization code and device code stores.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use orbit_auth::error::AuthError;
use orbit_auth::storage::{AuthorizationCodeStorage, DeviceCodeStorage};
use orbit_auth::types::{AuthorizationCode, DeviceCode, DeviceCodeStatus};
use orbit_auth::AuthResult;

/// Authorization codes keyed by (orbit, code value).
#[derive(Default)]
pub struct InMemoryAuthorizationCodeStore {
    codes: RwLock<HashMap<(Uuid, String), AuthorizationCode>>,
}

impl InMemoryAuthorizationCodeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthorizationCodeStorage for InMemoryAuthorizationCodeStore {
    async fn create(&self, code: &AuthorizationCode) -> AuthResult<()> {
        let mut codes = self.codes.write().unwrap();
        let key = (code.orbit_id, code.code.clone());
        if codes.contains_key(&key) {
            return Err(AuthError::conflict("Authorization code already exists"));
        }
        codes.insert(key, code.clone());
        Ok(())
    }

    async fn find(&self, orbit_id: Uuid, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        let codes = self.codes.read().unwrap();
        Ok(codes.get(&(orbit_id, code.to_string())).cloned())
    }

    async fn consume(&self, orbit_id: Uuid, code: &str) -> AuthResult<bool> {
        // Check and flip under one write lock: one winner per code.
        let mut codes = self.codes.write().unwrap();
        match codes.get_mut(&(orbit_id, code.to_string())) {
            Some(record) if !record.used => {
                record.used = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let mut codes = self.codes.write().unwrap();
        let before = codes.len();
        codes.retain(|_, c| c.expires_at >= now);
        Ok((before - codes.len()) as u64)
    }
}

/// Device authorization requests keyed by record ID.
#[derive(Default)]
pub struct InMemoryDeviceCodeStore {
    codes: RwLock<HashMap<Uuid, DeviceCode>>,
}

impl InMemoryDeviceCodeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceCodeStorage for InMemoryDeviceCodeStore {
    async fn create(&self, code: &DeviceCode) -> AuthResult<()> {
        let mut codes = self.codes.write().unwrap();
        let collision = codes.values().any(|c| {
            c.orbit_id == code.orbit_id
                && c.user_code == code.user_code
                && c.status == DeviceCodeStatus::Pending
        });
        if collision {
            return Err(AuthError::conflict("User code collides with a pending request"));
        }
        codes.insert(code.id, code.clone());
        Ok(())
    }

    async fn find_by_device_code_hash(
        &self,
        orbit_id: Uuid,
        device_code_hash: &str,
    ) -> AuthResult<Option<DeviceCode>> {
        let codes = self.codes.read().unwrap();
        Ok(codes
            .values()
            .find(|c| c.orbit_id == orbit_id && c.device_code_hash == device_code_hash)
            .cloned())
    }

    async fn find_by_user_code(
        &self,
        orbit_id: Uuid,
        user_code: &str,
    ) -> AuthResult<Option<DeviceCode>> {
        let codes = self.codes.read().unwrap();
        Ok(codes
            .values()
            .find(|c| c.orbit_id == orbit_id && c.user_code == user_code)
            .cloned())
    }

    async fn transition(
        &self,
        orbit_id: Uuid,
        id: Uuid,
        from: DeviceCodeStatus,
        to: DeviceCodeStatus,
        user_id: Option<Uuid>,
    ) -> AuthResult<bool> {
        let mut codes = self.codes.write().unwrap();
        match codes.get_mut(&id) {
            Some(c) if c.orbit_id == orbit_id && c.status == from => {
                c.status = to;
                if user_id.is_some() {
                    c.user_id = user_id;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_poll(&self, orbit_id: Uuid, id: Uuid, at: OffsetDateTime) -> AuthResult<()> {
        let mut codes = self.codes.write().unwrap();
        match codes.get_mut(&id) {
            Some(c) if c.orbit_id == orbit_id => {
                c.last_polled_at = Some(at);
                Ok(())
            }
            _ => Err(AuthError::not_found("device code")),
        }
    }

    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let mut codes = self.codes.write().unwrap();
        let before = codes.len();
        codes.retain(|_, c| c.expires_at >= now);
        Ok((before - codes.len()) as u64)
    }
}
