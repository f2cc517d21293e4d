//! Session storage trait.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::Session;

/// Storage trait for user sessions.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Stores a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn create(&self, session: &Session) -> AuthResult<()>;

    /// Finds a session by ID within an orbit.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, orbit_id: Uuid, id: Uuid) -> AuthResult<Option<Session>>;

    /// Updates activity and expiry on a live session.
    ///
    /// Returns `false` if the session is revoked or already expired at
    /// `last_active_at`; an inactive session must never slide forward.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not found or the storage
    /// operation fails.
    async fn touch(
        &self,
        orbit_id: Uuid,
        id: Uuid,
        last_active_at: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> AuthResult<bool>;

    /// Marks a session revoked.
    ///
    /// Returns `true` if the session existed and was not yet revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke(&self, orbit_id: Uuid, id: Uuid, at: OffsetDateTime) -> AuthResult<bool>;

    /// Lists a user's sessions, including inactive ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list_by_user(&self, orbit_id: Uuid, user_id: Uuid) -> AuthResult<Vec<Session>>;

    /// Deletes sessions whose `expires_at` is before `now`.
    ///
    /// Returns the number of records deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn cleanup_expired(&self, now: OffsetDateTime) -> AuthResult<u64>;
}
