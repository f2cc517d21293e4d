//! Access token record storage trait.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::AccessToken;

/// Storage trait for issued access token records.
#[async_trait]
pub trait AccessTokenStorage: Send + Sync {
    /// Stores a new access token record.
    ///
    /// # Errors
    ///
    /// Returns an error if the JTI already exists in the orbit or the
    /// storage operation fails.
    async fn create(&self, token: &AccessToken) -> AuthResult<()>;

    /// Finds a token record by JTI within an orbit.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_jti(&self, orbit_id: Uuid, jti: &str) -> AuthResult<Option<AccessToken>>;

    /// Marks a token revoked.
    ///
    /// Returns `true` if the record existed and was not yet revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke(&self, orbit_id: Uuid, jti: &str, at: OffsetDateTime) -> AuthResult<bool>;

    /// Lists tokens issued from a given refresh token record.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list_by_refresh_token(
        &self,
        orbit_id: Uuid,
        refresh_token_id: Uuid,
    ) -> AuthResult<Vec<AccessToken>>;

    /// Deletes records whose `expires_at` is before `now`.
    ///
    /// Returns the number of records deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64>;
}
