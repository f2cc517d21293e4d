//! Revocation ledger service.
//!
//! A thin layer over the append-only ledger that keeps the
//! introspection cache coherent: recording a revocation always drops
//! any cached introspection response for the same JTI, so a cached
//! `active: true` can never survive the revocation that contradicts it.

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::storage::{IntrospectionCacheStorage, RevocationLedgerStorage};
use crate::types::{RevokedToken, TokenType};

/// Service owning the revocation ledger.
pub struct RevocationService {
    ledger: Arc<dyn RevocationLedgerStorage>,
    cache: Arc<dyn IntrospectionCacheStorage>,
}

impl RevocationService {
    /// Creates a new revocation service.
    pub fn new(
        ledger: Arc<dyn RevocationLedgerStorage>,
        cache: Arc<dyn IntrospectionCacheStorage>,
    ) -> Self {
        Self { ledger, cache }
    }

    /// Records a revocation and invalidates the cached introspection
    /// response for the JTI.
    ///
    /// Recording an already-revoked JTI is a no-op; the first record
    /// stands.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn revoke(
        &self,
        orbit_id: Uuid,
        jti: &str,
        token_type: TokenType,
        reason: &str,
        token_expires_at: OffsetDateTime,
    ) -> AuthResult<()> {
        let record = RevokedToken {
            jti: jti.to_string(),
            orbit_id,
            token_type,
            reason: reason.to_string(),
            revoked_at: OffsetDateTime::now_utc(),
            expires_at: token_expires_at,
        };

        self.ledger.record(&record).await?;
        self.cache.invalidate(orbit_id, jti).await?;

        tracing::debug!(
            orbit_id = %orbit_id,
            token_type = %token_type,
            reason = %reason,
            "Token revocation recorded"
        );
        Ok(())
    }

    /// Returns `true` if the JTI is recorded as revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn is_revoked(&self, orbit_id: Uuid, jti: &str) -> AuthResult<bool> {
        self.ledger.is_revoked(orbit_id, jti).await
    }

    /// Fetches the ledger record for a JTI, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    pub async fn find(&self, orbit_id: Uuid, jti: &str) -> AuthResult<Option<RevokedToken>> {
        self.ledger.find(orbit_id, jti).await
    }
}
