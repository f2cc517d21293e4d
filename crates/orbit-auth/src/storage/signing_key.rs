//! Signing key storage trait.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::SigningKey;

/// Storage trait for orbit signing keys.
#[async_trait]
pub trait SigningKeyStorage: Send + Sync {
    /// Stores a new signing key.
    ///
    /// # Errors
    ///
    /// Returns an error if the kid already exists in the orbit or the
    /// storage operation fails.
    async fn create(&self, key: &SigningKey) -> AuthResult<()>;

    /// Finds a key by its kid within an orbit.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_kid(&self, orbit_id: Uuid, kid: &str) -> AuthResult<Option<SigningKey>>;

    /// Lists every key in the orbit, active or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list(&self, orbit_id: Uuid) -> AuthResult<Vec<SigningKey>>;

    /// Shortens a key's validity window to end at `expires_at`.
    ///
    /// Used during rotation to close the predecessor's window after
    /// the grace period. The window may only shrink; implementations
    /// reject an `expires_at` later than the current one.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not found, the window would
    /// grow, or the storage operation fails.
    async fn shorten_window(
        &self,
        orbit_id: Uuid,
        id: Uuid,
        expires_at: OffsetDateTime,
    ) -> AuthResult<()>;

    /// Marks a key inactive. The key stays published for verification.
    ///
    /// Returns `true` if the key existed and was active.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn deactivate(&self, orbit_id: Uuid, id: Uuid) -> AuthResult<bool>;
}
