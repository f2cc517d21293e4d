//! In-memory revocation ledger and introspection cache.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use orbit_auth::storage::{IntrospectionCacheStorage, RevocationLedgerStorage};
use orbit_auth::types::{IntrospectionEntry, RevokedToken};
use orbit_auth::AuthResult;

/// Append-only ledger keyed by (orbit, JTI). First record wins.
#[derive(Default)]
pub struct InMemoryRevocationLedger {
    records: RwLock<HashMap<(Uuid, String), RevokedToken>>,
}

impl InMemoryRevocationLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationLedgerStorage for InMemoryRevocationLedger {
    async fn record(&self, record: &RevokedToken) -> AuthResult<()> {
        let mut records = self.records.write().unwrap();
        records
            .entry((record.orbit_id, record.jti.clone()))
            .or_insert_with(|| record.clone());
        Ok(())
    }

    async fn is_revoked(&self, orbit_id: Uuid, jti: &str) -> AuthResult<bool> {
        let records = self.records.read().unwrap();
        Ok(records.contains_key(&(orbit_id, jti.to_string())))
    }

    async fn find(&self, orbit_id: Uuid, jti: &str) -> AuthResult<Option<RevokedToken>> {
        let records = self.records.read().unwrap();
        Ok(records.get(&(orbit_id, jti.to_string())).cloned())
    }

    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let mut records = self.records.write().unwrap();
        let before = records.len();
        records.retain(|_, r| r.expires_at >= now);
        Ok((before - records.len()) as u64)
    }
}

/// Introspection responses keyed by (orbit, JTI).
#[derive(Default)]
pub struct InMemoryIntrospectionCache {
    entries: RwLock<HashMap<(Uuid, String), IntrospectionEntry>>,
}

impl InMemoryIntrospectionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IntrospectionCacheStorage for InMemoryIntrospectionCache {
    async fn put(&self, entry: &IntrospectionEntry) -> AuthResult<()> {
        let mut entries = self.entries.write().unwrap();
        entries.insert((entry.orbit_id, entry.jti.clone()), entry.clone());
        Ok(())
    }

    async fn get(&self, orbit_id: Uuid, jti: &str) -> AuthResult<Option<IntrospectionEntry>> {
        let entries = self.entries.read().unwrap();
        Ok(entries.get(&(orbit_id, jti.to_string())).cloned())
    }

    async fn invalidate(&self, orbit_id: Uuid, jti: &str) -> AuthResult<()> {
        let mut entries = self.entries.write().unwrap();
        entries.remove(&(orbit_id, jti.to_string()));
        Ok(())
    }

    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at >= now);
        Ok((before - entries.len()) as u64)
    }
}
