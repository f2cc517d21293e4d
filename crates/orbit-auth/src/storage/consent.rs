//! Consent storage trait.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::Consent;

/// Storage trait for user consent records.
///
/// At most one record exists per (orbit, user, client); re-granting
/// replaces the existing record in place.
#[async_trait]
pub trait ConsentStorage: Send + Sync {
    /// Creates or replaces the consent for (user, client).
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn upsert(&self, consent: &Consent) -> AuthResult<()>;

    /// Finds the consent for a (user, client) pair.
    ///
    /// Returns the record regardless of expiry/revocation status.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find(
        &self,
        orbit_id: Uuid,
        user_id: Uuid,
        client_id: &str,
    ) -> AuthResult<Option<Consent>>;

    /// Marks a consent revoked.
    ///
    /// Returns `true` if the record existed and was not yet revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke(&self, orbit_id: Uuid, id: Uuid, at: OffsetDateTime) -> AuthResult<bool>;

    /// Lists a user's consents across clients.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list_by_user(&self, orbit_id: Uuid, user_id: Uuid) -> AuthResult<Vec<Consent>>;

    /// Deletes consents whose `expires_at` is before `now`.
    ///
    /// Returns the number of records deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64>;
}
