//! Revocation ledger and introspection cache storage traits.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::{IntrospectionEntry, RevokedToken};

/// Storage trait for the append-only revocation ledger.
///
/// The ledger keeps at most one record per (orbit, JTI); recording the
/// same JTI again keeps the first record. Records are only removed by
/// `cleanup_expired`, after the underlying token's natural expiry.
#[async_trait]
pub trait RevocationLedgerStorage: Send + Sync {
    /// Appends a revocation record.
    ///
    /// If the JTI is already recorded in the orbit, the existing record
    /// is kept and this call succeeds without changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn record(&self, record: &RevokedToken) -> AuthResult<()>;

    /// Returns `true` if the JTI is recorded as revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn is_revoked(&self, orbit_id: Uuid, jti: &str) -> AuthResult<bool>;

    /// Fetches the ledger record for a JTI, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find(&self, orbit_id: Uuid, jti: &str) -> AuthResult<Option<RevokedToken>>;

    /// Deletes records whose `expires_at` is before `now`.
    ///
    /// Returns the number of records deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64>;
}

/// Storage trait for cached introspection responses.
#[async_trait]
pub trait IntrospectionCacheStorage: Send + Sync {
    /// Stores a cache entry, replacing any existing entry for the JTI.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn put(&self, entry: &IntrospectionEntry) -> AuthResult<()>;

    /// Fetches the cache entry for a JTI, if any.
    ///
    /// May return expired entries; callers check `is_expired`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get(&self, orbit_id: Uuid, jti: &str) -> AuthResult<Option<IntrospectionEntry>>;

    /// Drops the cache entry for a JTI, if any.
    ///
    /// Called when the JTI is revoked so a stale `active: true` cannot
    /// be served afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn invalidate(&self, orbit_id: Uuid, jti: &str) -> AuthResult<()>;

    /// Deletes entries whose `expires_at` is before `now`.
    ///
    /// Returns the number of entries deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64>;
}
